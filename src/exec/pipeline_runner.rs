use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;

use pipeline::{ContextError, JobId, Key, RunContext, SampleSet, Stage};

use crate::fs::Fs;
use crate::prep::{self, InputKind, Inputs};
use crate::ui::Ui;

use super::job_check::submit_job_checks;
use super::stage_submitter::StageSubmitter;
use super::submit::Submit;

/// `PipelineRunner` submits every selected stage, in pipeline order.
///
/// Each stage's input list is either what its predecessor will write (when the
/// predecessor was submitted in this run) or what an earlier run left on disk.
/// Nothing waits for jobs to finish; ordering on the cluster is left to the
/// dependency clauses attached at submission.
pub struct PipelineRunner<'a, S> {
    submitter: S,
    fs: &'a Fs,
    ui: &'a mut Ui,
}

impl<'a, S: Submit> PipelineRunner<'a, S> {
    pub fn new(submitter: S, fs: &'a Fs, ui: &'a mut Ui) -> Self {
        Self { submitter, fs, ui }
    }

    pub fn run(&mut self, ctx: &mut RunContext, samples: &SampleSet) -> Result<()> {
        for stage in ctx.selection().iter() {
            let files: Vec<PathBuf>;
            let inputs = match prep::input_kind(stage) {
                InputKind::Samples => Inputs::Samples(samples),
                InputKind::Aggregate => Inputs::Nothing,
                InputKind::ReadFiles => {
                    files = self.read_files(ctx)?;
                    Inputs::Files(&files)
                }
                InputKind::PredecessorOutputs => {
                    files = self.predecessor_outputs(ctx, stage)?;
                    Inputs::Files(&files)
                }
            };
            if inputs.is_empty() {
                return Err(prep::Error::NoInputs {
                    stage,
                    what: inputs.describe(),
                }
                .into());
            }

            let plan = prep::plan_stage(stage, ctx.config(), ctx.selection(), inputs)
                .with_context(|| format!("while preparing stage \"{stage}\""))?;
            self.ui.submitting(stage, plan.jobs.len());

            let wait = StageSubmitter::new(&mut self.submitter)
                .submit(ctx, plan)
                .with_context(|| format!("while submitting stage \"{stage}\""))?;

            self.ui.submitted(stage, &wait);
        }
        eprintln!("{}\n", "Submitted pipeline.".green());
        Ok(())
    }

    /// Submit the job-check fan-out for every stage submitted so far.
    pub fn check_jobs(&mut self, ctx: &RunContext) -> Result<Vec<JobId>> {
        let mut ids = Vec::new();
        for (stage, logs) in ctx.logs().iter() {
            if logs.is_empty() {
                continue;
            }
            self.ui.checking(stage, logs.len());
            let checks = submit_job_checks(&mut self.submitter, ctx, stage)
                .with_context(|| format!("while submitting job checks for stage \"{stage}\""))?;
            self.ui.done();
            ids.extend(checks);
        }
        Ok(ids)
    }

    /// FASTQ files to run read QC over: everything in the raw directory,
    /// plus the files trim will write if it runs in this pipeline.
    fn read_files(&self, ctx: &RunContext) -> Result<Vec<PathBuf>> {
        let config = ctx.config();
        let raw_dir = config.dir(Key::FastqDir)?;
        let mut files = self
            .fs
            .list_files(raw_dir, "fastq.gz")
            .context("while listing raw reads")?;
        if ctx.is_selected(Stage::Trim) {
            let trim = ctx
                .outcome(Stage::Trim)
                .ok_or(ContextError::MissingWaitCondition(Stage::Trim))?;
            files.extend(trim.outputs.iter().cloned());
        }
        Ok(files)
    }

    fn predecessor_outputs(&self, ctx: &RunContext, stage: Stage) -> Result<Vec<PathBuf>> {
        let Some(pred) = stage.predecessor() else {
            return Ok(Vec::with_capacity(0));
        };
        if ctx.is_selected(pred) {
            let outcome = ctx
                .outcome(pred)
                .ok_or(ContextError::MissingWaitCondition(pred))?;
            return Ok(outcome.outputs.clone());
        }
        let Some((dir, suffix)) = prep::output_location(pred) else {
            return Ok(Vec::with_capacity(0));
        };
        let dir = ctx.config().dir(dir)?;
        self.ui
            .note(&format!("{stage}: {pred} not selected; reading inputs from {dir:?}"));
        self.fs
            .list_files(dir, suffix)
            .with_context(|| format!("while listing outputs of an earlier \"{pred}\" run"))
    }
}
