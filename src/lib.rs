//! Submits the stages of an ATAC-seq pipeline as chained Slurm jobs.

mod app;
mod args;
/// Scheduler submission and stage chaining
mod exec;
mod fs;
/// Per-stage command builders
mod prep;
mod settings;
mod ui;

pub use app::App;
pub use args::Args;
pub use exec::{
    extract_job_id, resolve_log_path, DryRunSubmitter, ParseError, SchedulerCommand, SlurmSubmitter,
    StageError, Submit, SubmissionError,
};
pub use settings::Settings;

/// Parse the command line, set up logging, and submit the selected stages.
pub fn run() -> anyhow::Result<()> {
    use clap::Parser;
    let settings: Settings = Args::parse().try_into()?;
    simple_logging::log_to_stderr(log_level(settings.verbose));
    App::new(settings).run()
}

/// Each `-v` lowers the threshold by one level, starting from warnings.
fn log_level(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_log_level() {
        assert_eq!(log::LevelFilter::Warn, log_level(0));
        assert_eq!(log::LevelFilter::Info, log_level(1));
        assert_eq!(log::LevelFilter::Trace, log_level(5));
    }
}
