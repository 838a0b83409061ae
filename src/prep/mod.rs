//! Turning a selected stage into the list of jobs it will submit.

use std::path::{Path, PathBuf};

use anyhow::Result;

use pipeline::{Key, RunConfig, SampleSet, ShellCommand, Stage, StageSet};

mod alignments;
mod qc;
mod reads;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unable to tell which sample \"{0}\" belongs to")]
    NoSampleToken(PathBuf),
    #[error("Stage \"{stage}\" needs {what}, but none were given")]
    NoInputs { stage: Stage, what: &'static str },
}

/// One submission's worth of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageJob {
    pub command: ShellCommand,
    /// files this job will write that later stages read
    pub outputs: Vec<PathBuf>,
}

impl StageJob {
    fn new(command: ShellCommand, outputs: Vec<PathBuf>) -> Self {
        Self { command, outputs }
    }
}

/// Jobs of one stage, with the scheduler flags and log location they share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    pub stage: Stage,
    pub flags: Key,
    pub log_dir: PathBuf,
    pub jobs: Vec<StageJob>,
}

/// What a stage iterates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// one job per discovered sample
    Samples,
    /// one job per FASTQ file
    ReadFiles,
    /// a single job, no per-item list
    Aggregate,
    /// one job per file written by the predecessor stage
    PredecessorOutputs,
}

pub fn input_kind(stage: Stage) -> InputKind {
    use Stage::*;
    match stage {
        Trim | Map => InputKind::Samples,
        FastQc => InputKind::ReadFiles,
        MultiQc => InputKind::Aggregate,
        MarkDuplicates | Filter | Coverage | BamToBed | ExtendReads | Peaks | AtacQc | BamQc => {
            InputKind::PredecessorOutputs
        }
    }
}

/// Directory and filename suffix of the files `stage` leaves for its successors,
/// used to pick up where an earlier run left off.
pub fn output_location(stage: Stage) -> Option<(Key, &'static str)> {
    use Stage::*;
    match stage {
        Trim => Some((Key::TrimmedFastqDir, "fastq.gz")),
        Map => Some((Key::SortedBamDir, alignments::SORTED_SUFFIX)),
        MarkDuplicates => Some((Key::MarkedBamDir, alignments::MARKED_SUFFIX)),
        Filter => Some((Key::FilteredBamDir, alignments::FILTERED_SUFFIX)),
        BamToBed => Some((Key::BedDir, alignments::BED_SUFFIX)),
        ExtendReads => Some((Key::ExtendedBedDir, alignments::EXTENDED_SUFFIX)),
        FastQc | MultiQc | Coverage | Peaks | AtacQc | BamQc => None,
    }
}

/// Config keys `stage` reads when run as part of `selection`.
pub fn required_keys(stage: Stage, selection: StageSet) -> Vec<Key> {
    use Stage::*;
    let mut keys: Vec<Key> = match stage {
        Trim => vec![
            Key::Cutadapt,
            Key::TrimReads,
            Key::FastqDir,
            Key::TrimmedFastqDir,
            Key::SlurmTrim,
        ],
        FastQc => vec![Key::FastQc, Key::FastqDir, Key::FastQcDir, Key::SlurmGeneral],
        MultiQc => vec![Key::MultiQc, Key::FastQcDir, Key::SlurmGeneral],
        Map => vec![
            Key::Bowtie2,
            Key::BowtieParameters,
            Key::ReferenceGenome,
            Key::Samtools,
            Key::BamDir,
            Key::SortedBamDir,
            Key::SlurmMapping,
        ],
        MarkDuplicates => vec![Key::Picard, Key::MarkedBamDir, Key::SlurmGeneral],
        Filter => vec![
            Key::Samtools,
            Key::DuplicatesRemoval,
            Key::FilteredBamDir,
            Key::SlurmFilterBam,
        ],
        Coverage => vec![Key::BamCoverage, Key::Bam2Bw, Key::BwDir, Key::SlurmGeneral],
        BamToBed => vec![
            Key::Bam2BedScript,
            Key::Bedtools,
            Key::BedDir,
            Key::SlurmGeneral,
        ],
        ExtendReads => vec![
            Key::ExtendReadsScript,
            Key::ExtendReads,
            Key::GenomeFileSize,
            Key::ExtendedBedDir,
            Key::SlurmGeneral,
        ],
        Peaks => vec![Key::Macs2, Key::PeakCalling, Key::PeaksDir, Key::SlurmPeakCalling],
        AtacQc => vec![Key::AtacSeqQc, Key::AtacQcDir, Key::SlurmGeneral],
        BamQc => vec![Key::BamQc, Key::AtacQcDir, Key::SlurmGeneral],
    };

    if stage == Map {
        keys.push(map_input_dir(selection));
    }
    if input_kind(stage) == InputKind::PredecessorOutputs {
        if let Some(pred) = stage.predecessor().filter(|pred| !selection.contains(*pred)) {
            if let Some((dir, _)) = output_location(pred) {
                keys.push(dir);
            }
        }
    }
    keys
}

/// Reads come from the trimmed directory if trim runs in the same pipeline.
pub fn map_input_dir(selection: StageSet) -> Key {
    if selection.contains(Stage::Trim) {
        Key::TrimmedFastqDir
    } else {
        Key::FastqDir
    }
}

/// Log directory of a stage's jobs: a `log` directory under its output directory.
pub fn log_dir_key(stage: Stage) -> Key {
    use Stage::*;
    match stage {
        Trim => Key::TrimmedFastqDir,
        FastQc | MultiQc => Key::FastQcDir,
        Map => Key::BamDir,
        MarkDuplicates => Key::MarkedBamDir,
        Filter => Key::FilteredBamDir,
        Coverage => Key::BwDir,
        BamToBed => Key::BedDir,
        ExtendReads => Key::ExtendedBedDir,
        Peaks => Key::PeaksDir,
        AtacQc | BamQc => Key::AtacQcDir,
    }
}

/// Directories a stage's jobs write into directly, which must exist before they run.
pub fn output_dirs(stage: Stage) -> Vec<Key> {
    let mut dirs = vec![log_dir_key(stage)];
    if let Some((dir, _)) = output_location(stage) {
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    dirs
}

/// Items a stage runs over.
#[derive(Debug, Clone, Copy)]
pub enum Inputs<'a> {
    Samples(&'a SampleSet),
    Files(&'a [PathBuf]),
    Nothing,
}

impl Inputs<'_> {
    pub fn is_empty(&self) -> bool {
        match self {
            Inputs::Samples(samples) => samples.is_empty(),
            Inputs::Files(files) => files.is_empty(),
            Inputs::Nothing => false,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Inputs::Samples(_) => "samples",
            Inputs::Files(_) | Inputs::Nothing => "input files",
        }
    }
}

/// Build every job of `stage`.
pub fn plan_stage(
    stage: Stage,
    config: &RunConfig,
    selection: StageSet,
    inputs: Inputs,
) -> Result<StagePlan> {
    use Stage::*;
    let jobs = match (stage, inputs) {
        (Trim, Inputs::Samples(samples)) => reads::trim(config, samples)?,
        (Map, Inputs::Samples(samples)) => reads::map(config, samples, selection)?,
        (FastQc, Inputs::Files(files)) => qc::fastqc(config, files)?,
        (MultiQc, _) => qc::multiqc(config)?,
        (MarkDuplicates, Inputs::Files(files)) => alignments::mark_duplicates(config, files)?,
        (Filter, Inputs::Files(files)) => alignments::filter(config, files)?,
        (Coverage, Inputs::Files(files)) => alignments::coverage(config, files)?,
        (BamToBed, Inputs::Files(files)) => alignments::bam_to_bed(config, files)?,
        (ExtendReads, Inputs::Files(files)) => alignments::extend_reads(config, files)?,
        (Peaks, Inputs::Files(files)) => alignments::peaks(config, files)?,
        (AtacQc, Inputs::Files(files)) => qc::atac_qc(config, files)?,
        (BamQc, Inputs::Files(files)) => qc::bam_qc(config, files)?,
        (stage, _) => {
            let what = match input_kind(stage) {
                InputKind::Samples => "samples",
                _ => "input files",
            };
            return Err(Error::NoInputs { stage, what }.into());
        }
    };
    Ok(StagePlan {
        stage,
        flags: flags_key(stage),
        log_dir: log_dir(config.dir(log_dir_key(stage))?),
        jobs,
    })
}

fn flags_key(stage: Stage) -> Key {
    match stage {
        Stage::Trim => Key::SlurmTrim,
        Stage::Map => Key::SlurmMapping,
        Stage::Filter => Key::SlurmFilterBam,
        Stage::Peaks => Key::SlurmPeakCalling,
        _ => Key::SlurmGeneral,
    }
}

pub fn log_dir(output_dir: &Path) -> PathBuf {
    output_dir.join("log")
}

/// Sample token of a stage input, or an error naming the file.
fn sample_of(path: &Path) -> Result<&str, Error> {
    pipeline::sample_token(path).ok_or_else(|| Error::NoSampleToken(path.to_owned()))
}

/// `<dir>/<sample><suffix>`
fn sample_file(dir: &Path, sample: &str, suffix: &str) -> PathBuf {
    dir.join(format!("{sample}{suffix}"))
}

#[cfg(test)]
pub(crate) mod test_config {
    use pipeline::RunConfig;

    pub fn config() -> RunConfig {
        RunConfig::from_pairs([
            ("wsbatch", "sbatch"),
            ("uid", "run1"),
            ("cutadapt", "cutadapt"),
            ("trim_reads", "-a CTGTCTCTTATA -A CTGTCTCTTATA -m 20"),
            ("bowtie2", "bowtie2"),
            ("bowtie_parameters", "--very-sensitive -p 8"),
            ("reference_genome", "/ref/hg38"),
            ("samtools", "samtools"),
            ("picard", "picard"),
            ("PCR_duplicates_removal", "-h -q 30 -F 1804"),
            ("bamCoverage", "bamCoverage"),
            ("bam2bw", "--binSize 10"),
            ("bedtools", "bedtools"),
            ("bam2bed_script", "/scripts/bam2bed.sh"),
            ("extendReadsScript", "/scripts/extend.sh"),
            ("extend_reads", "100"),
            ("genomeFileSize", "/ref/hg38.chrom.sizes"),
            ("macs2", "macs2"),
            ("peak_calling", "-f BED -g hs --nomodel"),
            ("FastQC", "fastqc"),
            ("multiQC", "multiqc"),
            ("ATACseqQC", "/scripts/atacqc.R"),
            ("bamQC", "/scripts/bamqc.R"),
            ("fastq_dir", "/data/fastq"),
            ("trimmed_fastq_dir", "/data/trimmed"),
            ("bam_dir", "/data/bam"),
            ("sorted_bam_dir", "/data/sorted"),
            ("marked_bam_dir", "/data/marked"),
            ("filtered_bam_dir", "/data/filtered"),
            ("bw_dir", "/data/bw"),
            ("bed_dir", "/data/bed"),
            ("extended_bed_dir", "/data/ext"),
            ("peaks_dir", "/data/peaks"),
            ("atacQC_dir", "/data/atacqc"),
            ("fastQC_dir", "/data/fastqc"),
            ("slurm_trim", "-c 4"),
            ("slurm_mapping", "-c 8 --mem 32G"),
            ("slurm_filter_bam", "-c 4"),
            ("slurm_peakCalling", "-c 2"),
            ("slurm_general", "-c 1"),
        ])
        .unwrap()
    }
}
