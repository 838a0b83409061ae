use std::fmt;
use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus};

use pipeline::{quote, Dependency, ShellCommand};

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Unable to run scheduler command \"{program}\"")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Scheduler command exited with {status}; output:\n{output}")]
    Failed { status: ExitStatus, output: String },
    #[error("Scheduler command is empty")]
    EmptyCommand,
}

/// A complete scheduler invocation, as an argument vector:
/// `wrapper... flags... -o <log pattern> [--dependency=...] --wrap=<command>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerCommand {
    argv: Vec<String>,
}

impl SchedulerCommand {
    pub fn new(
        wrapper: &str,
        flags: &[&str],
        log_pattern: &Path,
        dependency: Option<&Dependency>,
        command: &ShellCommand,
    ) -> Self {
        let mut argv: Vec<String> = wrapper.split_whitespace().map(str::to_owned).collect();
        argv.extend(flags.iter().map(|flag| (*flag).to_owned()));
        argv.push("-o".to_owned());
        argv.push(log_pattern.to_string_lossy().into_owned());
        if let Some(dependency) = dependency {
            argv.push(dependency.to_flag());
        }
        argv.push(format!("--wrap={command}"));
        Self { argv }
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// The `--dependency=...` argument, if any.
    pub fn dependency_flag(&self) -> Option<&str> {
        self.argv
            .iter()
            .map(String::as_str)
            .find(|arg| arg.starts_with("--dependency="))
    }

    /// The shell command passed through `--wrap`.
    pub fn wrapped(&self) -> Option<&str> {
        self.argv.last()?.strip_prefix("--wrap=")
    }
}

impl fmt::Display for SchedulerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.argv.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(&quote(arg))?;
        }
        Ok(())
    }
}

/// Hands a job to the scheduler and returns the scheduler's textual response.
pub trait Submit {
    fn submit(&mut self, command: &SchedulerCommand) -> Result<String, SubmissionError>;
}

impl<S: Submit + ?Sized> Submit for &mut S {
    fn submit(&mut self, command: &SchedulerCommand) -> Result<String, SubmissionError> {
        (**self).submit(command)
    }
}

/// Runs the scheduler command as a subprocess and waits for it to exit.
#[derive(Debug, Default)]
pub struct SlurmSubmitter;

impl Submit for SlurmSubmitter {
    fn submit(&mut self, command: &SchedulerCommand) -> Result<String, SubmissionError> {
        let (program, args) = command
            .argv()
            .split_first()
            .ok_or(SubmissionError::EmptyCommand)?;
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| SubmissionError::Spawn {
                program: program.clone(),
                source,
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        if output.status.success() {
            Ok(text)
        } else {
            Err(SubmissionError::Failed {
                status: output.status,
                output: text,
            })
        }
    }
}

/// Prints each command instead of running it, and acknowledges it with a made-up job id.
#[derive(Debug)]
pub struct DryRunSubmitter {
    next_id: u64,
}

impl DryRunSubmitter {
    pub fn new(first_id: u64) -> Self {
        Self { next_id: first_id }
    }
}

impl Submit for DryRunSubmitter {
    fn submit(&mut self, command: &SchedulerCommand) -> Result<String, SubmissionError> {
        println!("{command}");
        let id = self.next_id;
        self.next_id += 1;
        Ok(format!("Submitted batch job {id}"))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pipeline::{DependencyMode, JobId, WaitCondition};

    fn dependency() -> Dependency {
        let jobs = [JobId::new("11").unwrap(), JobId::new("12").unwrap()];
        Dependency::new(DependencyMode::AfterOk, WaitCondition::from_jobs(&jobs))
    }

    #[test]
    fn test_argv_order() {
        let cmd = ShellCommand::new("fastqc").arg("-o").path("/qc dir");
        let dep = dependency();
        let sched = SchedulerCommand::new(
            "sbatch --parsable",
            &["-c", "4"],
            Path::new("/log/r_slurm-%j.out"),
            Some(&dep),
            &cmd,
        );
        assert_eq!(
            &[
                "sbatch",
                "--parsable",
                "-c",
                "4",
                "-o",
                "/log/r_slurm-%j.out",
                "--dependency=afterok:11,12",
                "--wrap=fastqc -o '/qc dir'",
            ],
            sched.argv()
        );
        assert_eq!(Some("--dependency=afterok:11,12"), sched.dependency_flag());
        assert_eq!(Some("fastqc -o '/qc dir'"), sched.wrapped());
        assert_eq!(
            "sbatch --parsable -c 4 -o /log/r_slurm-%j.out --dependency=afterok:11,12 \
             '--wrap=fastqc -o '\\''/qc dir'\\'''",
            sched.to_string()
        );
    }

    #[test]
    fn test_no_dependency() {
        let cmd = ShellCommand::new("multiqc");
        let sched = SchedulerCommand::new("sbatch", &[], Path::new("/l/%j"), None, &cmd);
        assert_eq!(None, sched.dependency_flag());
        assert_eq!(4, sched.argv().len());
    }

    #[test]
    fn test_dry_run_counts_up() -> anyhow::Result<()> {
        let cmd = ShellCommand::new("true");
        let sched = SchedulerCommand::new("sbatch", &[], Path::new("/l/%j"), None, &cmd);
        let mut dry = DryRunSubmitter::new(500);
        assert_eq!("Submitted batch job 500", dry.submit(&sched)?);
        assert_eq!("Submitted batch job 501", dry.submit(&sched)?);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_slurm_submitter_merges_output_and_reports_failure() -> anyhow::Result<()> {
        let cmd = ShellCommand::new("x");
        // `sh -c <script> -o ...`: the remaining args land in $0, $1, ...
        let ok = SchedulerCommand::new(
            "sh -c",
            &["echo Submitted batch job 77; echo warn >&2"],
            Path::new("/l/%j"),
            None,
            &cmd,
        );
        let text = SlurmSubmitter.submit(&ok)?;
        assert!(text.contains("Submitted batch job 77"));
        assert!(text.contains("warn"));

        let failing = SchedulerCommand::new(
            "sh -c",
            &["echo denied; exit 3"],
            Path::new("/l/%j"),
            None,
            &cmd,
        );
        match SlurmSubmitter.submit(&failing) {
            Err(SubmissionError::Failed { status, output }) => {
                assert_eq!(Some(3), status.code());
                assert!(output.contains("denied"));
            }
            other => panic!("expected failure, got {other:?}"),
        }

        let missing = SchedulerCommand::new(
            "/nonexistent/sbatch",
            &[],
            Path::new("/l/%j"),
            None,
            &cmd,
        );
        assert!(matches!(
            SlurmSubmitter.submit(&missing),
            Err(SubmissionError::Spawn { .. })
        ));
        Ok(())
    }
}
