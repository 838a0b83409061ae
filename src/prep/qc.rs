use std::path::PathBuf;

use anyhow::Result;

use pipeline::{Key, RunConfig, ShellCommand};

use super::{sample_file, sample_of, StageJob};

pub fn fastqc(config: &RunConfig, fastqs: &[PathBuf]) -> Result<Vec<StageJob>> {
    let fastqc = config.get(Key::FastQc)?;
    let out_dir = config.dir(Key::FastQcDir)?;
    let jobs = fastqs
        .iter()
        .map(|fastq| {
            let command = ShellCommand::new(fastqc).arg("-o").path(out_dir).path(fastq);
            StageJob::new(command, Vec::with_capacity(0))
        })
        .collect();
    Ok(jobs)
}

/// A single job aggregating every FastQC report.
pub fn multiqc(config: &RunConfig) -> Result<Vec<StageJob>> {
    let multiqc = config.get(Key::MultiQc)?;
    let qc_dir = config.dir(Key::FastQcDir)?;
    let command = ShellCommand::new(multiqc)
        .arg("-s")
        .arg("-o")
        .path(qc_dir)
        .path(qc_dir);
    Ok(vec![StageJob::new(command, Vec::with_capacity(0))])
}

pub fn atac_qc(config: &RunConfig, bams: &[PathBuf]) -> Result<Vec<StageJob>> {
    let script = config.get(Key::AtacSeqQc)?;
    let out_dir = config.dir(Key::AtacQcDir)?;
    let jobs = bams
        .iter()
        .map(|bam| {
            let command = ShellCommand::new("Rscript")
                .raw(script)
                .path(bam)
                .path(out_dir);
            StageJob::new(command, Vec::with_capacity(0))
        })
        .collect();
    Ok(jobs)
}

pub fn bam_qc(config: &RunConfig, bams: &[PathBuf]) -> Result<Vec<StageJob>> {
    let script = config.get(Key::BamQc)?;
    let out_dir = config.dir(Key::AtacQcDir)?;
    let mut jobs = Vec::with_capacity(bams.len());
    for bam in bams {
        let stats = sample_file(out_dir, sample_of(bam)?, "_bamQC_stats.csv");
        let command = ShellCommand::new("Rscript")
            .raw(script)
            .path(bam)
            .path(&stats);
        jobs.push(StageJob::new(command, vec![stats]));
    }
    Ok(jobs)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prep::test_config::config;

    #[test]
    fn test_fastqc_one_job_per_file() -> Result<()> {
        let fastqs = vec![
            PathBuf::from("/data/fastq/S1_R1_001.fastq.gz"),
            PathBuf::from("/data/fastq/S1_R2_001.fastq.gz"),
        ];
        let jobs = fastqc(&config(), &fastqs)?;
        assert_eq!(2, jobs.len());
        assert_eq!(
            "fastqc -o /data/fastqc /data/fastq/S1_R2_001.fastq.gz",
            jobs[1].command.to_string()
        );
        Ok(())
    }

    #[test]
    fn test_multiqc_is_single_job() -> Result<()> {
        let jobs = multiqc(&config())?;
        assert_eq!(1, jobs.len());
        assert_eq!("multiqc -s -o /data/fastqc /data/fastqc", jobs[0].command.to_string());
        Ok(())
    }

    #[test]
    fn test_r_scripts() -> Result<()> {
        let bams = vec![PathBuf::from("/f/S1.QualTrim_NoDup_NochrM_SortedByCoord.bam")];
        let config = config();
        assert_eq!(
            "Rscript /scripts/atacqc.R /f/S1.QualTrim_NoDup_NochrM_SortedByCoord.bam /data/atacqc",
            atac_qc(&config, &bams)?[0].command.to_string()
        );
        assert_eq!(
            "Rscript /scripts/bamqc.R /f/S1.QualTrim_NoDup_NochrM_SortedByCoord.bam \
             /data/atacqc/S1_bamQC_stats.csv",
            bam_qc(&config, &bams)?[0].command.to_string()
        );
        Ok(())
    }
}
