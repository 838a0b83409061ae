use pipeline::{Stage, WaitCondition};

/// Submits every selected stage in order
mod pipeline_runner;
pub use pipeline_runner::PipelineRunner;

/// Submits the jobs of one stage
mod stage_submitter;

/// Fan-out of job-check jobs over a stage's logs
mod job_check;

/// Handing commands to the scheduler
mod submit;
pub use submit::{DryRunSubmitter, SchedulerCommand, SlurmSubmitter, Submit, SubmissionError};

/// Reading the scheduler's acknowledgement
mod response;
pub use response::{extract_job_id, resolve_log_path, ParseError};

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(
        "Stage \"{stage}\" aborted; jobs already submitted for it were not cancelled: [{submitted}]"
    )]
    Aborted {
        stage: Stage,
        submitted: WaitCondition,
    },
}
