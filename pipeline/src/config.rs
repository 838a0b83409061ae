use std::path::Path;

use syntax::ast::{Item, Value};
use util::{HashMap, IdVec};

use crate::job::DependencyMode;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Required config key \"{0}\" is not set")]
    MissingKey(&'static str),
    #[error("Config keys required by the selected stages are not set: {0}")]
    MissingKeys(String),
    #[error("Config key \"{0}\" is defined more than once")]
    DuplicateKey(String),
    #[error("Variable \"${var}\" used in config key \"{key}\" is not defined")]
    UndefinedVariable { var: String, key: String },
    #[error("Config key \"{0}\" refers to itself through variable interpolation")]
    InterpolationCycle(String),
    #[error("Invalid value for config key \"{key}\": {msg}")]
    InvalidValue { key: &'static str, msg: String },
}

macro_rules! config_keys {
    ($($variant:ident => $name:literal,)*) => {
        /// Every key the run config understands.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Key {
            $($variant,)*
        }

        impl Key {
            pub const ALL: &'static [Key] = &[$(Key::$variant,)*];

            /// Name of this key in the config file.
            pub fn name(self) -> &'static str {
                match self {
                    $(Key::$variant => $name,)*
                }
            }
        }
    };
}

config_keys! {
    // scheduler and run
    Wsbatch => "wsbatch",
    Uid => "uid",
    DependencyMode => "dependency_mode",
    // tool binaries
    Cutadapt => "cutadapt",
    Bowtie2 => "bowtie2",
    Samtools => "samtools",
    Picard => "picard",
    BamCoverage => "bamCoverage",
    Bedtools => "bedtools",
    Bam2BedScript => "bam2bed_script",
    ExtendReadsScript => "extendReadsScript",
    Macs2 => "macs2",
    FastQc => "FastQC",
    MultiQc => "multiQC",
    AtacSeqQc => "ATACseqQC",
    BamQc => "bamQC",
    JobCheck => "jobCheck",
    // per-stage scheduler flags
    SlurmTrim => "slurm_trim",
    SlurmMapping => "slurm_mapping",
    SlurmFilterBam => "slurm_filter_bam",
    SlurmPeakCalling => "slurm_peakCalling",
    SlurmGeneral => "slurm_general",
    // tool parameters
    TrimReads => "trim_reads",
    BowtieParameters => "bowtie_parameters",
    DuplicatesRemoval => "PCR_duplicates_removal",
    Bam2Bw => "bam2bw",
    ExtendReads => "extend_reads",
    PeakCalling => "peak_calling",
    // reference files
    ReferenceGenome => "reference_genome",
    GenomeFileSize => "genomeFileSize",
    // directories
    FastqDir => "fastq_dir",
    TrimmedFastqDir => "trimmed_fastq_dir",
    BamDir => "bam_dir",
    SortedBamDir => "sorted_bam_dir",
    MarkedBamDir => "marked_bam_dir",
    FilteredBamDir => "filtered_bam_dir",
    BwDir => "bw_dir",
    BedDir => "bed_dir",
    ExtendedBedDir => "extended_bed_dir",
    PeaksDir => "peaks_dir",
    AtacQcDir => "atacQC_dir",
    FastQcDir => "fastQC_dir",
    RawLog => "raw_log",
}

impl From<Key> for usize {
    fn from(key: Key) -> usize {
        key as usize
    }
}

#[derive(Debug, Clone)]
enum RawValue {
    Literal(String),
    Interp { text: String, vars: Vec<String> },
}

/// Config values as written in the file(s), before variable interpolation.
#[derive(Debug, Default)]
pub struct RawConfig {
    values: HashMap<String, RawValue>,
}

impl RawConfig {
    /// Add the assignments in `items`, returning the paths of any `include` items
    /// (in the order they appeared) for the caller to load next.
    pub fn add_items(&mut self, items: Vec<Item<'_>>) -> Result<Vec<String>, Error> {
        let mut includes = Vec::with_capacity(0);
        for item in items {
            match item {
                Item::Include(path) => includes.push(path.to_owned()),
                Item::Assignment { key, value } => {
                    if self.values.contains_key(key) {
                        return Err(Error::DuplicateKey(key.to_owned()));
                    }
                    let value = match value {
                        Value::Literal(s) => RawValue::Literal(s.to_owned()),
                        Value::Interp { text, vars } => RawValue::Interp {
                            text: text.to_owned(),
                            vars: vars.into_iter().map(str::to_owned).collect(),
                        },
                    };
                    self.values.insert(key.to_owned(), value);
                }
            }
        }
        Ok(includes)
    }

    /// Set `key` to a literal value, replacing any existing definition.
    pub fn set(&mut self, key: &str, value: &str) {
        self.values
            .insert(key.to_owned(), RawValue::Literal(value.to_owned()));
    }

    /// Interpolate all variables and convert into a typed `RunConfig`.
    pub fn resolve(self) -> Result<RunConfig, Error> {
        let mut done = HashMap::default();
        let mut stack = Vec::with_capacity(4);
        for key in self.values.keys() {
            self.resolve_key(key, &mut done, &mut stack)?;
        }
        RunConfig::from_resolved(done)
    }

    fn resolve_key(
        &self,
        key: &str,
        done: &mut HashMap<String, String>,
        stack: &mut Vec<String>,
    ) -> Result<String, Error> {
        if let Some(value) = done.get(key) {
            return Ok(value.clone());
        }
        let value = match &self.values[key] {
            RawValue::Literal(s) => s.clone(),
            RawValue::Interp { text, vars } => {
                if stack.iter().any(|k| k == key) {
                    return Err(Error::InterpolationCycle(key.to_owned()));
                }
                if let Some(var) = vars.iter().find(|v| !self.values.contains_key(v.as_str())) {
                    return Err(Error::UndefinedVariable {
                        var: var.clone(),
                        key: key.to_owned(),
                    });
                }
                stack.push(key.to_owned());
                let value = interpolate(text, |var| self.resolve_key(var, done, stack))?;
                stack.pop();
                value
            }
        };
        log::trace!("config {key} = {value:?}");
        done.insert(key.to_owned(), value.clone());
        Ok(value)
    }
}

/// Replace each `$ident` in `text` with `lookup(ident)`; a `$` not followed by an identifier stays.
fn interpolate<F>(text: &str, mut lookup: F) -> Result<String, Error>
where
    F: FnMut(&str) -> Result<String, Error>,
{
    let mut out = String::with_capacity(text.len() * 2);
    let mut rest = text;
    while let Some(dollar) = rest.find('$') {
        out.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];
        let ident_len = ident_len(after);
        if ident_len == 0 {
            out.push('$');
        } else {
            out.push_str(&lookup(&after[..ident_len])?);
        }
        rest = &after[ident_len..];
    }
    out.push_str(rest);
    Ok(out)
}

fn ident_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c == '_' || c.is_alphabetic() => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !(*c == '_' || c.is_alphanumeric()))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

fn parse_mode(mode: &str) -> Result<DependencyMode, Error> {
    mode.parse().map_err(|msg| Error::InvalidValue {
        key: Key::DependencyMode.name(),
        msg,
    })
}

/// Fully resolved, typed run configuration.
///
/// Only `wsbatch` and `uid` are required up front; everything else is checked
/// against the selected stages with [`RunConfig::check`] before any job is submitted.
#[derive(Debug, Clone)]
pub struct RunConfig {
    values: IdVec<Key, Option<String>>,
    dependency_mode: DependencyMode,
}

impl RunConfig {
    fn from_resolved(mut resolved: HashMap<String, String>) -> Result<Self, Error> {
        let mut values: IdVec<Key, Option<String>> = IdVec::with_defaults(Key::ALL.len());
        for key in Key::ALL {
            *values.get_mut(*key) = resolved.remove(key.name());
        }
        for unused in resolved.keys() {
            log::debug!("config key \"{unused}\" is not used directly by any stage");
        }

        let dependency_mode = match values.get(Key::DependencyMode) {
            Some(mode) => parse_mode(mode)?,
            None => DependencyMode::default(),
        };

        let cfg = Self {
            values,
            dependency_mode,
        };
        cfg.check(&[Key::Wsbatch, Key::Uid])?;
        if cfg.wrapper().trim().is_empty() {
            return Err(Error::InvalidValue {
                key: Key::Wsbatch.name(),
                msg: "scheduler wrapper command is empty".to_owned(),
            });
        }
        Ok(cfg)
    }

    /// Build a config directly from `(key, value)` pairs, with no interpolation.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut raw = RawConfig::default();
        for (k, v) in pairs {
            raw.set(k, v);
        }
        raw.resolve()
    }

    /// Value of `key`, or `MissingKey` if it was never set.
    pub fn get(&self, key: Key) -> Result<&str, Error> {
        self.values
            .get(key)
            .as_deref()
            .ok_or(Error::MissingKey(key.name()))
    }

    /// Value of `key` as a path.
    pub fn dir(&self, key: Key) -> Result<&Path, Error> {
        self.get(key).map(Path::new)
    }

    /// Value of `key` split into whitespace-separated words (for scheduler flags).
    pub fn words(&self, key: Key) -> Result<Vec<&str>, Error> {
        self.get(key).map(|s| s.split_whitespace().collect())
    }

    /// Fail with the full list of `keys` that are not set.
    pub fn check(&self, keys: &[Key]) -> Result<(), Error> {
        let missing: Vec<&'static str> = keys
            .iter()
            .filter(|key| self.values.get(**key).is_none())
            .map(|key| key.name())
            .collect();
        match missing.len() {
            0 => Ok(()),
            1 => Err(Error::MissingKey(missing[0])),
            _ => Err(Error::MissingKeys(missing.join(", "))),
        }
    }

    pub fn uid(&self) -> &str {
        self.values.get(Key::Uid).as_deref().unwrap_or_default()
    }

    /// Override the value of `key`.
    pub fn set(&mut self, key: Key, value: &str) -> Result<(), Error> {
        if key == Key::DependencyMode {
            self.dependency_mode = parse_mode(value)?;
        }
        *self.values.get_mut(key) = Some(value.to_owned());
        Ok(())
    }

    /// The scheduler submission wrapper (e.g. `sbatch`), possibly several words.
    pub fn wrapper(&self) -> &str {
        self.values.get(Key::Wsbatch).as_deref().unwrap_or_default()
    }

    pub fn dependency_mode(&self) -> DependencyMode {
        self.dependency_mode
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::Result;

    fn raw(text: &str) -> Result<RawConfig> {
        let mut raw = RawConfig::default();
        let includes = raw.add_items(syntax::parse(text)?)?;
        assert!(includes.is_empty());
        Ok(raw)
    }

    #[test]
    fn test_resolve_interpolation() -> Result<()> {
        let cfg = raw(
            "wsbatch = sbatch\nuid = r1\nroot = /scratch\n\
             bam_dir = \"$root/bam\"\nsorted_bam_dir = \"$bam_dir/sorted_$uid\"\n",
        )?
        .resolve()?;
        assert_eq!("/scratch/bam", cfg.get(Key::BamDir)?);
        assert_eq!("/scratch/bam/sorted_r1", cfg.get(Key::SortedBamDir)?);
        assert_eq!(DependencyMode::AfterOk, cfg.dependency_mode());
        Ok(())
    }

    #[test]
    fn test_undefined_variable() -> Result<()> {
        let e = raw("wsbatch = sbatch\nuid = r1\nbam_dir = \"$nope/bam\"\n")?
            .resolve()
            .unwrap_err();
        assert!(matches!(e, Error::UndefinedVariable { ref var, .. } if var == "nope"));
        Ok(())
    }

    #[test]
    fn test_interpolation_cycle() -> Result<()> {
        let e = raw("wsbatch = sbatch\nuid = r1\na = \"$b\"\nb = \"x$a\"\n")?
            .resolve()
            .unwrap_err();
        assert!(matches!(e, Error::InterpolationCycle(_)));
        Ok(())
    }

    #[test]
    fn test_duplicate_key() -> Result<()> {
        let mut cfg = raw("uid = r1\n")?;
        let e = cfg.add_items(syntax::parse("uid = r2\n")?).unwrap_err();
        assert!(matches!(e, Error::DuplicateKey(_)));
        Ok(())
    }

    #[test]
    fn test_required_and_missing_keys() -> Result<()> {
        let e = RunConfig::from_pairs([("wsbatch", "sbatch")]).unwrap_err();
        assert!(matches!(e, Error::MissingKey("uid")));

        let cfg = RunConfig::from_pairs([("wsbatch", "sbatch"), ("uid", "r1")])?;
        let e = cfg.check(&[Key::Cutadapt, Key::TrimReads]).unwrap_err();
        assert_eq!(
            "Config keys required by the selected stages are not set: cutadapt, trim_reads",
            e.to_string()
        );
        assert!(matches!(cfg.get(Key::Macs2), Err(Error::MissingKey("macs2"))));
        Ok(())
    }

    #[test]
    fn test_dependency_mode_and_words() -> Result<()> {
        let cfg = RunConfig::from_pairs([
            ("wsbatch", "sbatch"),
            ("uid", "r1"),
            ("dependency_mode", "afterany"),
            ("slurm_general", "  -p short   --mem 8G "),
        ])?;
        assert_eq!(DependencyMode::AfterAny, cfg.dependency_mode());
        assert_eq!(vec!["-p", "short", "--mem", "8G"], cfg.words(Key::SlurmGeneral)?);

        let e = RunConfig::from_pairs([
            ("wsbatch", "sbatch"),
            ("uid", "r1"),
            ("dependency_mode", "afterburner"),
        ])
        .unwrap_err();
        assert!(matches!(e, Error::InvalidValue { key: "dependency_mode", .. }));
        Ok(())
    }

    #[test]
    fn test_set_overrides() -> Result<()> {
        let mut cfg = RunConfig::from_pairs([("wsbatch", "sbatch"), ("uid", "r1")])?;
        cfg.set(Key::BamDir, "/other/bam")?;
        cfg.set(Key::DependencyMode, "afterany")?;
        assert_eq!("/other/bam", cfg.get(Key::BamDir)?);
        assert_eq!(DependencyMode::AfterAny, cfg.dependency_mode());
        assert!(cfg.set(Key::DependencyMode, "whenever").is_err());
        assert_eq!(DependencyMode::AfterAny, cfg.dependency_mode());
        cfg.set(Key::Uid, "r2")?;
        assert_eq!("r2", cfg.uid());
        Ok(())
    }

    #[test]
    fn test_interpolate_keeps_bare_dollar() -> Result<()> {
        let out = interpolate("cost $5 for $item.", |var| Ok(format!("<{var}>")))?;
        assert_eq!("cost $5 for <item>.", out);
        Ok(())
    }
}
