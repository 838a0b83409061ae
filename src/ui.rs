use std::io::BufRead;
use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use pipeline::{Stage, WaitCondition};
use util::Timer;

/// Progress messages and prompts. Everything goes to stderr;
/// stdout is left for dry-run commands and the log registry.
pub struct Ui {
    /// -v: per-stage detail and timings
    pub verbose: bool,
    /// -y: answer yes to every prompt
    assume_yes: bool,
    /// restarted whenever a stage starts submitting
    stage_timer: Timer,
}

impl Ui {
    pub fn new(verbose: bool, assume_yes: bool) -> Self {
        Self {
            verbose,
            assume_yes,
            stage_timer: Timer::now(),
        }
    }

    /// Ask a yes/no question. Only an answer starting with `y` counts as yes.
    pub fn confirm(&self, prompt: &str) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        eprint!("{prompt} (y/N) ");
        let mut answer = String::with_capacity(8);
        std::io::stdin().lock().read_line(&mut answer)?;
        Ok(matches!(answer.trim_start().chars().next(), Some('y' | 'Y')))
    }

    pub fn reading_config(&self, path: &Path) {
        if self.verbose {
            eprint!("{} {}... ", "Reading config".magenta(), path.display());
        }
    }

    pub fn note(&self, msg: &str) {
        if self.verbose {
            eprintln!("{msg}");
        }
    }

    /// Announce a stage before its jobs go to the scheduler.
    pub fn submitting(&mut self, stage: Stage, jobs: usize) {
        self.stage_timer.reset();
        let noun = if jobs == 1 { "job" } else { "jobs" };
        eprintln!("{} {stage} ({jobs} {noun})", "SUBMIT".green());
    }

    /// Report the wait-condition a stage left for its successors.
    pub fn submitted(&self, stage: Stage, wait: &WaitCondition) {
        if self.verbose {
            eprintln!(
                "{} {stage}: waiting on [{wait}] after {:?}",
                "SUBMITTED".green(),
                self.stage_timer.elapsed()
            );
        }
    }

    pub fn checking(&self, stage: Stage, logs: usize) {
        if self.verbose {
            eprint!("{} {logs} job checks for {stage}... ", "Submitting".magenta());
        }
    }

    pub fn done(&self) {
        if self.verbose {
            eprintln!("{}.", "done".green());
        }
    }
}
