use anyhow::Result;

use pipeline::{JobId, Key, RunContext, ShellCommand, Stage};

use crate::fs::paths;

use super::response::extract_job_id;
use super::submit::{SchedulerCommand, Submit};

/// Submit one job-check per log file of `stage`. Each waits for every job
/// of the stage to exit, however it exits.
pub fn submit_job_checks<S: Submit + ?Sized>(
    submitter: &mut S,
    ctx: &RunContext,
    stage: Stage,
) -> Result<Vec<JobId>> {
    let config = ctx.config();
    let job_check = config.get(Key::JobCheck)?;
    let pattern = paths::job_check_pattern(config.dir(Key::RawLog)?);
    let dependency = ctx.any_exit_of(stage)?;

    let logs = ctx.logs().get(stage);
    let mut ids = Vec::with_capacity(logs.len());
    for log in logs {
        let check = ShellCommand::new(job_check).arg("-w").arg("-log").path(log);
        let command =
            SchedulerCommand::new(config.wrapper(), &[], &pattern, Some(&dependency), &check);
        log::info!("{command}");
        let response = submitter.submit(&command)?;
        ids.push(extract_job_id(&response)?);
    }
    Ok(ids)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::exec::stage_submitter::test::FakeScheduler;
    use pipeline::{RunConfig, StageOutcome, StageSet};
    use std::path::PathBuf;

    #[test]
    fn test_one_check_per_log() -> Result<()> {
        let config = RunConfig::from_pairs([
            ("wsbatch", "sbatch"),
            ("uid", "r1"),
            ("jobCheck", "python3 /tools/jobCheck.py"),
            ("raw_log", "/logs"),
        ])?;
        let mut ctx = RunContext::new(config, StageSet::starting_from(Stage::Filter));
        let jobs = vec![JobId::new("31").unwrap(), JobId::new("32").unwrap()];
        let logs = vec![
            PathBuf::from("/f/log/r1_slurm-31.out"),
            PathBuf::from("/f/log/r1_slurm-32.out"),
        ];
        ctx.record(Stage::Filter, StageOutcome::new(jobs, logs, Vec::new()))?;

        let mut fake = FakeScheduler::new(900);
        let ids = submit_job_checks(&mut fake, &ctx, Stage::Filter)?;
        assert_eq!(vec!["900", "901"], ids.iter().map(JobId::as_str).collect::<Vec<_>>());

        let first = &fake.calls[0];
        assert_eq!(
            &[
                "sbatch",
                "-o",
                "/logs/slurm-%j.out",
                "--dependency=afterany:31,32",
                "--wrap=python3 /tools/jobCheck.py -w -log /f/log/r1_slurm-31.out",
            ],
            first.argv()
        );
        Ok(())
    }

    #[test]
    fn test_stage_not_submitted() {
        let config = RunConfig::from_pairs([
            ("wsbatch", "sbatch"),
            ("uid", "r1"),
            ("jobCheck", "jobCheck"),
            ("raw_log", "/logs"),
        ])
        .unwrap();
        let ctx = RunContext::new(config, StageSet::starting_from(Stage::Filter));
        let mut fake = FakeScheduler::new(1);
        assert!(submit_job_checks(&mut fake, &ctx, Stage::Filter).is_err());
        assert!(fake.calls.is_empty());
    }
}
