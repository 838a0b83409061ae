use std::fmt;
use std::str::FromStr;

use util::Bitmask;

#[derive(Debug, thiserror::Error)]
#[error("Unknown stage \"{0}\" (expected one of: {list})", list = Stage::token_list())]
pub struct UnknownStage(pub String);

/// One step of the pipeline, submitted as a batch of per-sample scheduler jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Trim,
    FastQc,
    MultiQc,
    Map,
    MarkDuplicates,
    Filter,
    Coverage,
    BamToBed,
    ExtendReads,
    Peaks,
    AtacQc,
    BamQc,
}

impl Stage {
    pub const COUNT: usize = 12;

    /// All stages, in the order the driver submits them.
    /// Every stage comes after its predecessor.
    pub const ALL: [Stage; Self::COUNT] = [
        Stage::Trim,
        Stage::FastQc,
        Stage::MultiQc,
        Stage::Map,
        Stage::MarkDuplicates,
        Stage::Filter,
        Stage::Coverage,
        Stage::BamToBed,
        Stage::ExtendReads,
        Stage::Peaks,
        Stage::AtacQc,
        Stage::BamQc,
    ];

    /// Token used on the command line and in log output.
    pub fn token(self) -> &'static str {
        match self {
            Stage::Trim => "trim",
            Stage::FastQc => "fastqc",
            Stage::MultiQc => "multiqc",
            Stage::Map => "map",
            Stage::MarkDuplicates => "dedup",
            Stage::Filter => "filter",
            Stage::Coverage => "coverage",
            Stage::BamToBed => "bed",
            Stage::ExtendReads => "extend",
            Stage::Peaks => "peaks",
            Stage::AtacQc => "atacqc",
            Stage::BamQc => "bamqc",
        }
    }

    /// The stage whose wait-condition this stage depends on, when both run together.
    pub fn predecessor(self) -> Option<Stage> {
        match self {
            Stage::Trim => None,
            Stage::FastQc => Some(Stage::Trim),
            Stage::MultiQc => Some(Stage::FastQc),
            Stage::Map => Some(Stage::Trim),
            Stage::MarkDuplicates => Some(Stage::Map),
            Stage::Filter => Some(Stage::MarkDuplicates),
            Stage::Coverage => Some(Stage::Filter),
            Stage::BamToBed => Some(Stage::Filter),
            Stage::ExtendReads => Some(Stage::BamToBed),
            Stage::Peaks => Some(Stage::ExtendReads),
            Stage::AtacQc => Some(Stage::Filter),
            Stage::BamQc => Some(Stage::Filter),
        }
    }

    /// True if `self` is `ancestor` or (transitively) depends on it.
    pub fn descends_from(self, ancestor: Stage) -> bool {
        let mut cur = Some(self);
        while let Some(stage) = cur {
            if stage == ancestor {
                return true;
            }
            cur = stage.predecessor();
        }
        false
    }

    fn token_list() -> String {
        Self::ALL.map(Stage::token).join(", ")
    }
}

impl From<Stage> for usize {
    fn from(stage: Stage) -> usize {
        stage as usize
    }
}

impl TryFrom<usize> for Stage {
    type Error = ();
    fn try_from(i: usize) -> Result<Self, ()> {
        Stage::ALL.get(i).copied().ok_or(())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Stage {
    type Err = UnknownStage;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let stage = match lower.as_str() {
            "mark-duplicates" | "markdup" => Stage::MarkDuplicates,
            "bam2bw" | "bigwig" => Stage::Coverage,
            "bam2bed" => Stage::BamToBed,
            "extend-reads" => Stage::ExtendReads,
            other => *Stage::ALL
                .iter()
                .find(|stage| stage.token() == other)
                .ok_or_else(|| UnknownStage(s.to_owned()))?,
        };
        Ok(stage)
    }
}

/// The active-stage selection set: which stages this invocation actually submits.
/// Stages outside the set are assumed to have completed in an earlier run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageSet {
    mask: u16,
}

impl StageSet {
    pub fn insert(&mut self, stage: Stage) {
        self.mask.set(stage.into());
    }

    pub fn remove(&mut self, stage: Stage) {
        self.mask.unset(stage.into());
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.mask.get(stage.into())
    }

    pub fn len(&self) -> usize {
        self.mask.count()
    }

    pub fn is_empty(&self) -> bool {
        self.mask.is_clear()
    }

    /// `start` plus every stage downstream of it.
    pub fn starting_from(start: Stage) -> Self {
        Stage::ALL
            .into_iter()
            .filter(|stage| stage.descends_from(start))
            .collect()
    }

    /// Selected stages, in submission order.
    pub fn iter(&self) -> impl Iterator<Item = Stage> + '_ {
        Stage::ALL.into_iter().filter(|stage| self.contains(*stage))
    }
}

impl FromIterator<Stage> for StageSet {
    fn from_iter<T: IntoIterator<Item = Stage>>(iter: T) -> Self {
        let mut set = StageSet::default();
        for stage in iter {
            set.insert(stage);
        }
        set
    }
}

impl fmt::Display for StageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for stage in self.iter() {
            if !first {
                f.write_str(",")?;
            }
            f.write_str(stage.token())?;
            first = false;
        }
        Ok(())
    }
}
