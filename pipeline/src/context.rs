use std::path::PathBuf;

use util::IdVec;

use crate::config::RunConfig;
use crate::job::{Dependency, DependencyMode, JobId, WaitCondition};
use crate::stage::{Stage, StageSet};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Stage \"{0}\" is selected but has not recorded a wait-condition yet")]
    MissingWaitCondition(Stage),
    #[error("Stage \"{0}\" was already submitted in this run")]
    DuplicateOutcome(Stage),
}

/// Everything a submitted stage leaves behind for the stages after it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageOutcome {
    /// comma-joined ids of `jobs`
    pub wait: WaitCondition,
    /// one id per submitted item, in input order
    pub jobs: Vec<JobId>,
    /// scheduler log file of each job
    pub logs: Vec<PathBuf>,
    /// files the stage's jobs will write, in input order
    pub outputs: Vec<PathBuf>,
}

impl StageOutcome {
    pub fn new(jobs: Vec<JobId>, logs: Vec<PathBuf>, outputs: Vec<PathBuf>) -> Self {
        Self {
            wait: WaitCondition::from_jobs(&jobs),
            jobs,
            logs,
            outputs,
        }
    }
}

/// State for one pipeline invocation: the config, the selection set,
/// and the outcome of every stage submitted so far.
#[derive(Debug)]
pub struct RunContext {
    config: RunConfig,
    selection: StageSet,
    outcomes: IdVec<Stage, Option<StageOutcome>>,
}

impl RunContext {
    pub fn new(config: RunConfig, selection: StageSet) -> Self {
        Self {
            config,
            selection,
            outcomes: IdVec::with_defaults(Stage::COUNT),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn selection(&self) -> StageSet {
        self.selection
    }

    pub fn is_selected(&self, stage: Stage) -> bool {
        self.selection.contains(stage)
    }

    /// The dependency clause `stage` must carry: one on its predecessor's wait-condition
    /// if the predecessor is selected in this run, otherwise none.
    pub fn dependency_for(&self, stage: Stage) -> Result<Option<Dependency>, Error> {
        let Some(pred) = stage.predecessor() else {
            return Ok(None);
        };
        if !self.is_selected(pred) {
            log::debug!("{stage}: predecessor {pred} not selected; no dependency");
            return Ok(None);
        }
        let wait = self.wait_for(pred)?;
        if wait.is_empty() {
            log::warn!("{stage}: predecessor {pred} submitted no jobs; no dependency");
            return Ok(None);
        }
        Ok(Some(Dependency::new(
            self.config.dependency_mode(),
            wait.clone(),
        )))
    }

    /// Dependency on every job of `stage`, released however they exit.
    pub fn any_exit_of(&self, stage: Stage) -> Result<Dependency, Error> {
        Ok(Dependency::new(
            DependencyMode::AfterAny,
            self.wait_for(stage)?.clone(),
        ))
    }

    /// Wait-condition recorded by `stage`.
    pub fn wait_for(&self, stage: Stage) -> Result<&WaitCondition, Error> {
        self.outcome(stage)
            .map(|outcome| &outcome.wait)
            .ok_or(Error::MissingWaitCondition(stage))
    }

    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.outcomes.get(stage).as_ref()
    }

    /// Record the outcome of `stage`. Each stage records exactly once per run.
    pub fn record(&mut self, stage: Stage, outcome: StageOutcome) -> Result<&StageOutcome, Error> {
        let slot = self.outcomes.get_mut(stage);
        if slot.is_some() {
            return Err(Error::DuplicateOutcome(stage));
        }
        log::info!(
            "{stage}: recorded {} jobs (wait-condition \"{}\")",
            outcome.jobs.len(),
            outcome.wait
        );
        let outcome: &StageOutcome = slot.insert(outcome);
        Ok(outcome)
    }

    /// Read-only view of the log files of every submitted stage.
    pub fn logs(&self) -> LogRegistry<'_> {
        LogRegistry {
            outcomes: &self.outcomes,
        }
    }
}

/// Read-only per-stage view of scheduler log paths, for log-polling collaborators.
#[derive(Debug, Clone, Copy)]
pub struct LogRegistry<'a> {
    outcomes: &'a IdVec<Stage, Option<StageOutcome>>,
}

impl<'a> LogRegistry<'a> {
    /// Log paths of `stage`; empty if it was not submitted.
    pub fn get(&self, stage: Stage) -> &'a [PathBuf] {
        self.outcomes
            .get(stage)
            .as_ref()
            .map(|outcome| outcome.logs.as_slice())
            .unwrap_or_default()
    }

    /// Submitted stages with their log paths, in submission order.
    pub fn iter(&self) -> impl Iterator<Item = (Stage, &'a [PathBuf])> + 'a {
        self.outcomes
            .iter_ids()
            .filter_map(|(stage, outcome)| Some((stage, outcome.as_ref()?.logs.as_slice())))
    }

    /// Total number of log paths across all stages.
    pub fn len(&self) -> usize {
        self.iter().map(|(_, logs)| logs.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
