use std::fmt;
use std::str::FromStr;

/// Scheduler-assigned job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    /// Returns `None` unless `id` is a non-empty string of ascii digits.
    pub fn new(id: &str) -> Option<Self> {
        if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(id.to_owned()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Comma-joined job ids that a dependent job waits on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitCondition(String);

impl WaitCondition {
    /// Join `jobs` in order.
    pub fn from_jobs(jobs: &[JobId]) -> Self {
        let mut s = String::with_capacity(jobs.len() * 8);
        for (i, job) in jobs.iter().enumerate() {
            if i > 0 {
                s.push(',');
            }
            s.push_str(job.as_str());
        }
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which kind of predecessor completion releases a dependent job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DependencyMode {
    /// all predecessors exited successfully
    #[default]
    AfterOk,
    /// all predecessors exited, whatever their status
    AfterAny,
}

impl DependencyMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DependencyMode::AfterOk => "afterok",
            DependencyMode::AfterAny => "afterany",
        }
    }
}

impl FromStr for DependencyMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "afterok" => Ok(DependencyMode::AfterOk),
            "afterany" => Ok(DependencyMode::AfterAny),
            other => Err(format!(
                "unknown dependency mode \"{other}\" (expected afterok or afterany)"
            )),
        }
    }
}

/// A dependency clause attached to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub mode: DependencyMode,
    pub wait: WaitCondition,
}

impl Dependency {
    pub fn new(mode: DependencyMode, wait: WaitCondition) -> Self {
        Self { mode, wait }
    }

    /// e.g. `--dependency=afterok:101,102,103`
    pub fn to_flag(&self) -> String {
        format!("--dependency={}:{}", self.mode.as_str(), self.wait)
    }
}
