use std::path::{Path, PathBuf};

use pipeline::JobId;

use crate::fs::paths;

#[derive(Debug, thiserror::Error)]
#[error("No job id found in scheduler response {0:?}")]
pub struct ParseError(pub String);

const ACK_PHRASE: &str = "Submitted batch job";

/// Find the job id in a scheduler response.
///
/// Recognized forms, tried in order:
/// 1. `Submitted batch job <id>` anywhere in the text;
/// 2. a `--parsable` line, `<id>` or `<id>;<cluster>`, searching from the last line up;
/// 3. the last whitespace-separated token made only of digits.
pub fn extract_job_id(response: &str) -> Result<JobId, ParseError> {
    acknowledged(response)
        .or_else(|| parsable(response))
        .or_else(|| last_numeric_token(response))
        .ok_or_else(|| ParseError(response.to_owned()))
}

fn acknowledged(response: &str) -> Option<JobId> {
    let (_, rest) = response.split_once(ACK_PHRASE)?;
    let rest = rest.trim_start();
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    JobId::new(&rest[..end])
}

fn parsable(response: &str) -> Option<JobId> {
    response.lines().rev().find_map(|line| {
        let line = line.trim();
        let id = line.split_once(';').map_or(line, |(id, _)| id);
        JobId::new(id)
    })
}

fn last_numeric_token(response: &str) -> Option<JobId> {
    response.split_whitespace().rev().find_map(JobId::new)
}

/// Where the scheduler writes the log of the job acknowledged by `response`:
/// the `-o` pattern from [`paths::log_pattern`] with the job id filled in.
pub fn resolve_log_path(
    log_dir: &Path,
    run_id: &str,
    response: &str,
) -> Result<PathBuf, ParseError> {
    let job = extract_job_id(response)?;
    Ok(paths::log_file(log_dir, run_id, &job))
}
