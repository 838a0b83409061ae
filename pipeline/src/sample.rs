use std::path::Path;

/// Filename suffix of a sample's forward-read FASTQ file.
pub const R1_SUFFIX: &str = "_R1_001.fastq.gz";
/// Filename suffix of a sample's reverse-read FASTQ file.
pub const R2_SUFFIX: &str = "_R2_001.fastq.gz";

/// The sample a stage output belongs to: its basename up to the first `.`.
///
/// `/bam/S1.sortedByCoord.Picard.bam` -> `S1`
pub fn sample_token(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    let token = name.split('.').next()?;
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Ordered, duplicate-free sample identifiers, fixed for the duration of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleSet {
    samples: Vec<String>,
}

impl SampleSet {
    /// Collect samples from FASTQ file names of the form `<sample>_R1_001.fastq.gz`.
    /// Other names are ignored.
    pub fn from_fastq_names<'a, I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut samples: Vec<String> = names
            .into_iter()
            .filter_map(|name| name.strip_suffix(R1_SUFFIX))
            .filter(|sample| !sample.is_empty())
            .map(str::to_owned)
            .collect();
        samples.sort();
        samples.dedup();
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.samples.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for SampleSet {
    /// Keeps the given order; drops repeats.
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut samples: Vec<String> = Vec::new();
        for sample in iter {
            let sample = sample.into();
            if !samples.contains(&sample) {
                samples.push(sample);
            }
        }
        Self { samples }
    }
}
