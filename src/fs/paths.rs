use std::path::{Path, PathBuf};

use pipeline::JobId;

/// Placeholder the scheduler replaces with the job id in `-o` patterns.
pub const JOB_ID_PLACEHOLDER: &str = "%j";

/// $LOG_DIR/<run_id>_slurm-%j.out
pub fn log_pattern(log_dir: &Path, run_id: &str) -> PathBuf {
    log_dir.join(format!("{run_id}_slurm-{JOB_ID_PLACEHOLDER}.out"))
}

/// $LOG_DIR/<run_id>_slurm-<job>.out
pub fn log_file(log_dir: &Path, run_id: &str, job: &JobId) -> PathBuf {
    log_dir.join(format!("{run_id}_slurm-{job}.out"))
}

/// $RAW_LOG/slurm-%j.out, for job-check submissions
pub fn job_check_pattern(raw_log: &Path) -> PathBuf {
    raw_log.join(format!("slurm-{JOB_ID_PLACEHOLDER}.out"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pattern_round_trip() {
        let dir = Path::new("/data/trimmed/log");
        let job = JobId::new("4242").unwrap();
        let pattern = log_pattern(dir, "run7");
        assert_eq!(Path::new("/data/trimmed/log/run7_slurm-%j.out"), pattern);
        let substituted = pattern
            .to_str()
            .unwrap()
            .replace(JOB_ID_PLACEHOLDER, job.as_str());
        assert_eq!(Path::new(&substituted), log_file(dir, "run7", &job));
    }

    #[test]
    fn test_job_check_pattern() {
        assert_eq!(
            Path::new("/logs/raw/slurm-%j.out"),
            job_check_pattern(Path::new("/logs/raw"))
        );
    }
}
