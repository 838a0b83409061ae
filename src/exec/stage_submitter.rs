use std::path::{Path, PathBuf};

use anyhow::Result;

use pipeline::{JobId, RunContext, StageOutcome, WaitCondition};

use crate::fs::paths;
use crate::prep::StagePlan;

use super::response::{extract_job_id, resolve_log_path};
use super::submit::{SchedulerCommand, Submit};
use super::StageError;

/// Submits the jobs of one stage, in order, and records what they leave behind.
pub struct StageSubmitter<'a, S: ?Sized> {
    submitter: &'a mut S,
}

impl<'a, S: Submit + ?Sized> StageSubmitter<'a, S> {
    pub fn new(submitter: &'a mut S) -> Self {
        Self { submitter }
    }

    /// Submit every job in `plan`, record the stage outcome in `ctx`,
    /// and return the stage's wait-condition.
    ///
    /// A failed submission aborts the stage without recording anything;
    /// jobs submitted before the failure are named in the error.
    pub fn submit(&mut self, ctx: &mut RunContext, plan: StagePlan) -> Result<WaitCondition> {
        let StagePlan {
            stage,
            flags,
            log_dir,
            jobs,
        } = plan;
        let dependency = ctx.dependency_for(stage)?;
        let config = ctx.config();
        let flags = config.words(flags)?;
        let run_id = config.uid();
        let pattern = paths::log_pattern(&log_dir, run_id);

        let mut submitted = Vec::with_capacity(jobs.len());
        let mut logs = Vec::with_capacity(jobs.len());
        let mut outputs = Vec::with_capacity(jobs.len());
        for job in jobs {
            let command = SchedulerCommand::new(
                config.wrapper(),
                &flags,
                &pattern,
                dependency.as_ref(),
                &job.command,
            );
            let (id, log) = self.submit_one(&command, &log_dir, run_id).map_err(|e| {
                e.context(StageError::Aborted {
                    stage,
                    submitted: WaitCondition::from_jobs(&submitted),
                })
            })?;
            submitted.push(id);
            logs.push(log);
            outputs.extend(job.outputs);
        }

        let outcome = ctx.record(stage, StageOutcome::new(submitted, logs, outputs))?;
        Ok(outcome.wait.clone())
    }

    fn submit_one(
        &mut self,
        command: &SchedulerCommand,
        log_dir: &Path,
        run_id: &str,
    ) -> Result<(JobId, PathBuf)> {
        log::info!("{command}");
        let response = self.submitter.submit(command)?;
        log::debug!("scheduler response: {}", response.trim_end());
        let id = extract_job_id(&response)?;
        let log = resolve_log_path(log_dir, run_id, &response)?;
        Ok((id, log))
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::exec::SubmissionError;
    use crate::prep::StageJob;
    use pipeline::{Key, RunConfig, ShellCommand, Stage, StageSet};

    /// Records every command and acknowledges with sequential ids,
    /// failing on the `fail_at`-th call (0-based) if set.
    pub struct FakeScheduler {
        pub next_id: u64,
        pub fail_at: Option<usize>,
        pub calls: Vec<SchedulerCommand>,
    }

    impl FakeScheduler {
        pub fn new(first_id: u64) -> Self {
            Self {
                next_id: first_id,
                fail_at: None,
                calls: Vec::new(),
            }
        }
    }

    /// The error a rejected `sbatch` call produces.
    fn rejected() -> SubmissionError {
        const OUTPUT: &str = "sbatch: error: invalid partition";
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            SubmissionError::Failed {
                status: std::process::ExitStatus::from_raw(1 << 8),
                output: OUTPUT.to_owned(),
            }
        }
        #[cfg(not(unix))]
        {
            SubmissionError::Spawn {
                program: "sbatch".to_owned(),
                source: std::io::Error::new(std::io::ErrorKind::Other, OUTPUT),
            }
        }
    }

    impl Submit for FakeScheduler {
        fn submit(&mut self, command: &SchedulerCommand) -> Result<String, SubmissionError> {
            if self.fail_at == Some(self.calls.len()) {
                return Err(rejected());
            }
            self.calls.push(command.clone());
            let id = self.next_id;
            self.next_id += 1;
            Ok(format!("Submitted batch job {id}\n"))
        }
    }

    fn ctx(selection: &[Stage]) -> RunContext {
        let config = RunConfig::from_pairs([
            ("wsbatch", "sbatch"),
            ("uid", "r1"),
            ("slurm_trim", "-c 4 --mem=8G"),
            ("slurm_mapping", "-c 8"),
        ])
        .unwrap();
        RunContext::new(config, selection.iter().copied().collect::<StageSet>())
    }

    fn plan(stage: Stage, flags: Key, samples: &[&str]) -> StagePlan {
        let jobs = samples
            .iter()
            .map(|s| StageJob {
                command: ShellCommand::new("tool").arg(*s),
                outputs: vec![PathBuf::from(format!("/out/{s}.x"))],
            })
            .collect();
        StagePlan {
            stage,
            flags,
            log_dir: PathBuf::from(format!("/log/{stage}")),
            jobs,
        }
    }

    #[test]
    fn test_wait_condition_has_every_id_in_order() -> Result<()> {
        let mut ctx = ctx(&[Stage::Trim, Stage::Map]);
        let mut fake = FakeScheduler::new(101);
        let wait = StageSubmitter::new(&mut fake)
            .submit(&mut ctx, plan(Stage::Trim, Key::SlurmTrim, &["S1", "S2", "S3"]))?;
        assert_eq!("101,102,103", wait.as_str());

        let outcome = ctx.outcome(Stage::Trim).unwrap();
        assert_eq!(
            vec![
                PathBuf::from("/log/trim/r1_slurm-101.out"),
                PathBuf::from("/log/trim/r1_slurm-102.out"),
                PathBuf::from("/log/trim/r1_slurm-103.out"),
            ],
            outcome.logs
        );
        assert_eq!(PathBuf::from("/out/S2.x"), outcome.outputs[1]);

        for call in &fake.calls {
            assert_eq!(None, call.dependency_flag());
            assert_eq!(
                &["sbatch", "-c", "4", "--mem=8G", "-o", "/log/trim/r1_slurm-%j.out"],
                &call.argv()[..6]
            );
        }
        Ok(())
    }

    #[test]
    fn test_successor_depends_on_predecessor_wait() -> Result<()> {
        let mut ctx = ctx(&[Stage::Trim, Stage::Map]);
        let mut fake = FakeScheduler::new(101);
        let mut submitter = StageSubmitter::new(&mut fake);
        submitter.submit(&mut ctx, plan(Stage::Trim, Key::SlurmTrim, &["S1", "S2", "S3"]))?;
        let wait =
            submitter.submit(&mut ctx, plan(Stage::Map, Key::SlurmMapping, &["S1", "S2", "S3"]))?;
        assert_eq!("104,105,106", wait.as_str());

        let map_calls = &fake.calls[3..];
        assert_eq!(3, map_calls.len());
        for call in map_calls {
            assert_eq!(Some("--dependency=afterok:101,102,103"), call.dependency_flag());
        }
        Ok(())
    }

    #[test]
    fn test_unselected_predecessor_means_no_dependency() -> Result<()> {
        let mut ctx = ctx(&[Stage::Map]);
        let mut fake = FakeScheduler::new(1);
        StageSubmitter::new(&mut fake)
            .submit(&mut ctx, plan(Stage::Map, Key::SlurmMapping, &["S1"]))?;
        assert_eq!(None, fake.calls[0].dependency_flag());
        Ok(())
    }

    #[test]
    fn test_failure_records_nothing() {
        let mut ctx = ctx(&[Stage::Trim]);
        let mut fake = FakeScheduler::new(7);
        fake.fail_at = Some(2);
        let err = StageSubmitter::new(&mut fake)
            .submit(&mut ctx, plan(Stage::Trim, Key::SlurmTrim, &["S1", "S2", "S3"]))
            .unwrap_err();

        match err.downcast_ref::<StageError>() {
            Some(StageError::Aborted { stage, submitted }) => {
                assert_eq!(Stage::Trim, *stage);
                assert_eq!("7,8", submitted.as_str());
            }
            None => panic!("expected an aborted stage, got {err:?}"),
        }
        assert!(err.downcast_ref::<SubmissionError>().is_some());
        assert!(ctx.outcome(Stage::Trim).is_none());
        assert!(ctx.wait_for(Stage::Trim).is_err());
    }

    #[test]
    fn test_unparseable_response_aborts() {
        struct Garbled;
        impl Submit for Garbled {
            fn submit(&mut self, _: &SchedulerCommand) -> Result<String, SubmissionError> {
                Ok("ok".to_owned())
            }
        }
        let mut ctx = ctx(&[Stage::Trim]);
        let err = StageSubmitter::new(&mut Garbled)
            .submit(&mut ctx, plan(Stage::Trim, Key::SlurmTrim, &["S1"]))
            .unwrap_err();
        assert!(err.downcast_ref::<crate::exec::ParseError>().is_some());
        assert!(ctx.outcome(Stage::Trim).is_none());
    }

    #[test]
    fn test_log_path_follows_acknowledged_id() -> Result<()> {
        struct Noisy;
        impl Submit for Noisy {
            fn submit(&mut self, _: &SchedulerCommand) -> Result<String, SubmissionError> {
                Ok("sbatch: warning: job will pend 2 hours\nSubmitted batch job 4242\n".to_owned())
            }
        }
        let mut ctx = ctx(&[Stage::Map]);
        let wait = StageSubmitter::new(&mut Noisy)
            .submit(&mut ctx, plan(Stage::Map, Key::SlurmMapping, &["S1"]))?;
        assert_eq!("4242", wait.as_str());
        assert_eq!(
            vec![PathBuf::from("/log/map/r1_slurm-4242.out")],
            ctx.logs().get(Stage::Map)
        );
        Ok(())
    }
}
