use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;

use pipeline::{Key, RawConfig, RunConfig, RunContext, SampleSet, R1_SUFFIX};

use crate::exec::{DryRunSubmitter, PipelineRunner, SlurmSubmitter, Submit};
use crate::fs::Fs;
use crate::prep::{self, InputKind};
use crate::settings::{self, Settings};
use crate::ui::Ui;

/// Made-up job ids handed out in dry runs start here.
const DRY_RUN_FIRST_ID: u64 = 1;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("No samples found: no \"*{R1_SUFFIX}\" files in {0:?}")]
    NoSamples(PathBuf),
    #[error("Config file {0:?} is included more than once")]
    IncludedTwice(PathBuf),
}

/// This struct actually runs the command-line app.
pub struct App {
    /// Interpreted command line settings
    settings: Settings,
    /// Filesystem interface
    fs: Fs,
    /// User interface
    ui: Ui,
}

impl App {
    /// Create a new `App`.
    pub fn new(settings: Settings) -> Self {
        let fs = Fs::new(settings.dry_run);
        let ui = Ui::new(settings.verbose > 0, settings.yes);
        Self { settings, fs, ui }
    }

    /// Load the config, then submit every selected stage.
    pub fn run(mut self) -> Result<()> {
        let config = self.load_config()?;
        self.check_config(&config)?;
        let samples = self.discover_samples(&config)?;

        self.print_plan(&config, &samples);
        if !self.settings.dry_run && !self.ui.confirm("Submit?")? {
            return Ok(());
        }

        self.prepare_output_dirs(&config)
            .context("while creating output directories")?;

        let mut ctx = RunContext::new(config, self.settings.selection);
        if self.settings.dry_run {
            self.submit(DryRunSubmitter::new(DRY_RUN_FIRST_ID), &mut ctx, &samples)?;
        } else {
            self.submit(SlurmSubmitter, &mut ctx, &samples)?;
        }

        print_log_registry(&ctx);
        Ok(())
    }

    fn submit<S: Submit>(
        &mut self,
        submitter: S,
        ctx: &mut RunContext,
        samples: &SampleSet,
    ) -> Result<()> {
        let mut runner = PipelineRunner::new(submitter, &self.fs, &mut self.ui);
        runner.run(ctx, samples)?;
        if self.settings.job_check {
            let checks = runner.check_jobs(ctx)?;
            eprintln!("{} {} job checks", "SUBMITTED".green(), checks.len());
        }
        Ok(())
    }
}

// CONFIG //////////////////
impl App {
    /// Read the config file and everything it includes, then resolve variables.
    fn load_config(&self) -> Result<RunConfig> {
        let mut raw = RawConfig::default();
        let mut strbuf = String::with_capacity(0); // will be resized later.
        let mut loaded: Vec<PathBuf> = Vec::with_capacity(1);
        let mut pending = vec![self.settings.config.clone()];

        while let Some(path) = pending.pop() {
            let path = path
                .canonicalize()
                .with_context(|| format!("while looking for config file {:?}", path))?;
            if loaded.contains(&path) {
                return Err(Error::IncludedTwice(path).into());
            }

            self.ui.reading_config(&path);
            self.fs
                .read_to_buf(&path, &mut strbuf)
                .with_context(|| format!("while reading config file {:?}", path))?;
            let items = syntax::parse(&strbuf)
                .with_context(|| format!("while parsing config file {:?}", path))?;
            let includes = raw
                .add_items(items)
                .with_context(|| format!("while loading config file {:?}", path))?;
            self.ui.done();

            let dir = path.parent().ok_or(settings::Error::ConfigHasNoParent)?;
            pending.extend(includes.iter().rev().map(|include| dir.join(include)));
            loaded.push(path);
        }

        if let Some(uid) = &self.settings.uid {
            log::info!("overriding run id with {uid:?}");
            raw.set(Key::Uid.name(), uid);
        }
        let config = raw.resolve().context("while resolving config")?;
        log::debug!(
            "run id {}, dependency mode {}",
            config.uid(),
            config.dependency_mode().as_str()
        );
        Ok(config)
    }

    /// Fail early, before anything is submitted, if a selected stage is missing a key.
    fn check_config(&self, config: &RunConfig) -> Result<()> {
        let selection = self.settings.selection;
        let mut keys: Vec<Key> = selection
            .iter()
            .flat_map(|stage| prep::required_keys(stage, selection))
            .collect();
        if self.settings.job_check {
            keys.extend([Key::JobCheck, Key::RawLog]);
        }
        keys.sort_by_key(|key| usize::from(*key));
        keys.dedup();
        config
            .check(&keys)
            .with_context(|| format!("while checking config for stages {selection}"))?;
        Ok(())
    }

    /// Samples are only needed when a per-sample stage is selected.
    fn discover_samples(&self, config: &RunConfig) -> Result<SampleSet> {
        let needs_samples = self
            .settings
            .selection
            .iter()
            .any(|stage| prep::input_kind(stage) == InputKind::Samples);
        if !needs_samples {
            return Ok(SampleSet::default());
        }

        let dir = config.dir(Key::FastqDir)?;
        let files = self
            .fs
            .list_files(dir, R1_SUFFIX)
            .context("while looking for samples")?;
        let samples =
            SampleSet::from_fastq_names(files.iter().filter_map(|f| f.file_name()?.to_str()));
        if samples.is_empty() {
            return Err(Error::NoSamples(dir.to_owned()).into());
        }
        Ok(samples)
    }
}

// OUTPUT //////////////////
impl App {
    fn prepare_output_dirs(&mut self, config: &RunConfig) -> Result<()> {
        let verbose = self.ui.verbose;
        for stage in self.settings.selection.iter() {
            let out_dir = config.dir(prep::log_dir_key(stage))?;
            self.fs.whitelist(out_dir);
            self.fs.ensure_dir(prep::log_dir(out_dir), verbose)?;
            for key in prep::output_dirs(stage) {
                let dir = config.dir(key)?;
                self.fs.whitelist(dir);
                self.fs.ensure_dir(dir, verbose)?;
            }
        }
        if self.settings.job_check {
            let raw_log = config.dir(Key::RawLog)?;
            self.fs.whitelist(raw_log);
            self.fs.ensure_dir(raw_log, verbose)?;
        }
        Ok(())
    }

    fn print_plan(&self, config: &RunConfig, samples: &SampleSet) {
        eprintln!("{} {}", "Stages:".bold(), self.settings.selection);
        eprintln!(
            "{} {} ({} dependencies)",
            "Run id:".bold(),
            config.uid(),
            config.dependency_mode().as_str()
        );
        if !samples.is_empty() {
            let names: Vec<&str> = samples.iter().collect();
            eprintln!("{} {}", format!("{} samples:", samples.len()).bold(), names.join(", "));
        }
        if self.settings.job_check {
            eprintln!("Job checks will be submitted for every job.");
        }
        if self.settings.dry_run {
            eprintln!("{}", "Dry run: nothing will be submitted.".yellow());
        }
        eprintln!();
    }
}

/// One line per scheduler log: `<stage>\t<path>`.
fn print_log_registry(ctx: &RunContext) {
    let logs = ctx.logs();
    eprintln!("{} {} jobs", "SUBMITTED".green(), logs.len());
    for (stage, paths) in logs.iter() {
        for path in paths {
            println!("{stage}\t{}", path.display());
        }
    }
}
