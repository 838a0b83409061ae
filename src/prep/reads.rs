use anyhow::Result;

use pipeline::{
    Key, RunConfig, SampleSet, ShellCommand, Stage, StageSet, R1_SUFFIX, R2_SUFFIX,
};

use super::{map_input_dir, sample_file, StageJob};

pub const TRIMMED_R1_SUFFIX: &str = ".trim_R1_001.fastq.gz";
pub const TRIMMED_R2_SUFFIX: &str = ".trim_R2_001.fastq.gz";

pub fn trim(config: &RunConfig, samples: &SampleSet) -> Result<Vec<StageJob>> {
    let cutadapt = config.get(Key::Cutadapt)?;
    let params = config.get(Key::TrimReads)?;
    let fastq_dir = config.dir(Key::FastqDir)?;
    let trimmed_dir = config.dir(Key::TrimmedFastqDir)?;

    let jobs = samples
        .iter()
        .map(|s| {
            let out_r1 = sample_file(trimmed_dir, s, TRIMMED_R1_SUFFIX);
            let out_r2 = sample_file(trimmed_dir, s, TRIMMED_R2_SUFFIX);
            let command = ShellCommand::new(cutadapt)
                .raw(params)
                .arg("-o")
                .path(&out_r1)
                .arg("-p")
                .path(&out_r2)
                .path(sample_file(fastq_dir, s, R1_SUFFIX))
                .path(sample_file(fastq_dir, s, R2_SUFFIX));
            StageJob::new(command, vec![out_r1, out_r2])
        })
        .collect();
    Ok(jobs)
}

pub fn map(config: &RunConfig, samples: &SampleSet, selection: StageSet) -> Result<Vec<StageJob>> {
    let bowtie2 = config.get(Key::Bowtie2)?;
    let params = config.get(Key::BowtieParameters)?;
    let reference = config.get(Key::ReferenceGenome)?;
    let samtools = config.get(Key::Samtools)?;
    let in_dir = config.dir(map_input_dir(selection))?;
    let (r1_suffix, r2_suffix) = if selection.contains(Stage::Trim) {
        (TRIMMED_R1_SUFFIX, TRIMMED_R2_SUFFIX)
    } else {
        (R1_SUFFIX, R2_SUFFIX)
    };
    let bam_dir = config.dir(Key::BamDir)?;
    let sorted_dir = config.dir(Key::SortedBamDir)?;

    let jobs = samples
        .iter()
        .map(|s| {
            let raw_bam = sample_file(bam_dir, s, ".raw.bam");
            let sorted_bam = sample_file(sorted_dir, s, super::alignments::SORTED_SUFFIX);
            let command = ShellCommand::new(bowtie2)
                .raw(params)
                .arg("-x")
                .raw(reference)
                .arg("-1")
                .path(sample_file(in_dir, s, r1_suffix))
                .arg("-2")
                .path(sample_file(in_dir, s, r2_suffix))
                .pipe(samtools)
                .arg("view")
                .arg("-b")
                .arg("-h")
                .arg("-o")
                .path(&raw_bam)
                .and_then(samtools)
                .arg("sort")
                .arg("-O")
                .arg("BAM")
                .arg("-o")
                .path(&sorted_bam)
                .path(&raw_bam);
            StageJob::new(command, vec![sorted_bam])
        })
        .collect();
    Ok(jobs)
}
