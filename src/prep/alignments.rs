//! Stages that run over BAM and BED files of earlier stages.

use std::path::PathBuf;

use anyhow::Result;

use pipeline::{Key, RunConfig, ShellCommand};

use super::{sample_file, sample_of, StageJob};

pub const SORTED_SUFFIX: &str = ".sortedByCoord.bam";
pub const MARKED_SUFFIX: &str = ".sortedByCoord.Picard.bam";
pub const FILTERED_SUFFIX: &str = ".QualTrim_NoDup_NochrM_SortedByCoord.bam";
pub const BED_SUFFIX: &str = ".bed";
pub const EXTENDED_SUFFIX: &str = ".extendedReads.bed";

const SAMTOOLS_THREADS: &str = "4";
const DROP_CHR_M: &str = r#"{if($3!="chrM"){print}}"#;

/// Build one job per file with `build(sample, file) -> (command, outputs)`.
fn per_file<F>(files: &[PathBuf], mut build: F) -> Result<Vec<StageJob>>
where
    F: FnMut(&str, &PathBuf) -> (ShellCommand, Vec<PathBuf>),
{
    let mut jobs = Vec::with_capacity(files.len());
    for file in files {
        let sample = sample_of(file)?;
        let (command, outputs) = build(sample, file);
        jobs.push(StageJob::new(command, outputs));
    }
    Ok(jobs)
}

pub fn mark_duplicates(config: &RunConfig, bams: &[PathBuf]) -> Result<Vec<StageJob>> {
    let picard = config.get(Key::Picard)?;
    let out_dir = config.dir(Key::MarkedBamDir)?;

    per_file(bams, |s, bam| {
        let out = sample_file(out_dir, s, MARKED_SUFFIX);
        let metrics = sample_file(out_dir, s, ".metrix");
        let command = ShellCommand::new(picard)
            .arg("MarkDuplicates")
            .arg(format!("I={}", bam.display()))
            .arg(format!("O={}", out.display()))
            .arg(format!("M={}", metrics.display()));
        (command, vec![out])
    })
}

pub fn filter(config: &RunConfig, bams: &[PathBuf]) -> Result<Vec<StageJob>> {
    let samtools = config.get(Key::Samtools)?;
    let params = config.get(Key::DuplicatesRemoval)?;
    let out_dir = config.dir(Key::FilteredBamDir)?;

    per_file(bams, |s, bam| {
        let out = sample_file(out_dir, s, FILTERED_SUFFIX);
        let command = ShellCommand::new(samtools)
            .arg("view")
            .raw(params)
            .arg("-@")
            .arg(SAMTOOLS_THREADS)
            .path(bam)
            .pipe("awk")
            .arg(DROP_CHR_M)
            .pipe(samtools)
            .arg("view")
            .arg("-b")
            .arg("-o")
            .path(&out)
            .arg("-@")
            .arg(SAMTOOLS_THREADS)
            .and_then(samtools)
            .arg("index")
            .path(&out)
            .arg("-@")
            .arg(SAMTOOLS_THREADS);
        (command, vec![out])
    })
}

pub fn coverage(config: &RunConfig, bams: &[PathBuf]) -> Result<Vec<StageJob>> {
    let bam_coverage = config.get(Key::BamCoverage)?;
    let params = config.get(Key::Bam2Bw)?;
    let out_dir = config.dir(Key::BwDir)?;

    per_file(bams, |s, bam| {
        let out = sample_file(out_dir, s, ".bw");
        let command = ShellCommand::new(bam_coverage)
            .raw(params)
            .arg("--bam")
            .path(bam)
            .arg("-o")
            .path(&out);
        (command, vec![out])
    })
}

pub fn bam_to_bed(config: &RunConfig, bams: &[PathBuf]) -> Result<Vec<StageJob>> {
    let script = config.get(Key::Bam2BedScript)?;
    let bedtools = config.get(Key::Bedtools)?;
    let out_dir = config.dir(Key::BedDir)?;

    per_file(bams, |s, bam| {
        let out = sample_file(out_dir, s, BED_SUFFIX);
        let command = ShellCommand::new("source")
            .raw(script)
            .raw(bedtools)
            .path(bam)
            .path(&out);
        (command, vec![out])
    })
}

pub fn extend_reads(config: &RunConfig, beds: &[PathBuf]) -> Result<Vec<StageJob>> {
    let script = config.get(Key::ExtendReadsScript)?;
    let extend = config.get(Key::ExtendReads)?;
    let genome_size = config.get(Key::GenomeFileSize)?;
    let out_dir = config.dir(Key::ExtendedBedDir)?;

    per_file(beds, |s, bed| {
        let out = sample_file(out_dir, s, EXTENDED_SUFFIX);
        let command = ShellCommand::new("source")
            .raw(script)
            .path(bed)
            .raw(extend)
            .raw(genome_size)
            .path(&out);
        (command, vec![out])
    })
}

pub fn peaks(config: &RunConfig, beds: &[PathBuf]) -> Result<Vec<StageJob>> {
    let macs2 = config.get(Key::Macs2)?;
    let params = config.get(Key::PeakCalling)?;
    let out_dir = config.dir(Key::PeaksDir)?;

    per_file(beds, |s, bed| {
        let out = sample_file(out_dir, s, ".MACS");
        let command = ShellCommand::new(macs2)
            .arg("callpeak")
            .raw(params)
            .arg("-t")
            .path(bed)
            .arg("-n")
            .arg(s)
            .arg("--outdir")
            .path(&out);
        (command, vec![out])
    })
}
