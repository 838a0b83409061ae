use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use util::PathEncodingError;

/// Scheduler log file naming
pub mod paths;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("\"{0}\" exists but is not a directory")]
    NotDirectory(String),
    #[error("Can't perform IO operation: \"{0}\" is not whitelisted")]
    NotWhitelisted(String),
    #[error("Directory \"{0}\" does not exist")]
    MissingDirectory(String),
}

/// All file operations in the crate should go through this struct.
///
/// Directories are only ever created under one of the whitelisted prefixes
/// (the output directories of the selected stages). Under `dry_run` nothing is written.
#[derive(Debug, Default)]
pub struct Fs {
    /// directories we are allowed to create things in
    writable: Vec<PathBuf>,
    /// if true, prevents all destructive operations
    dry_run: bool,
}

impl Fs {
    pub fn new(dry_run: bool) -> Self {
        Self {
            writable: Vec::with_capacity(0),
            dry_run,
        }
    }

    /// Allow directories to be created at or below `prefix`.
    pub fn whitelist<T: AsRef<Path>>(&mut self, prefix: T) {
        let prefix = prefix.as_ref();
        if !self.is_whitelisted(prefix) {
            self.writable.push(prefix.to_path_buf());
        }
    }

    /// Check if path exists on disk.
    pub fn exists<T: AsRef<Path>>(&self, path: T) -> bool {
        let path = path.as_ref();
        path.exists() || path.is_symlink()
    }

    /// Check if path exists and is a directory.
    pub fn is_dir<T: AsRef<Path>>(&self, path: T) -> Result<bool> {
        let path = path.as_ref();
        if path.is_dir() || (path.is_symlink() && path.canonicalize()?.is_dir()) {
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Make sure `dir` exists, creating it (and its parents) if needed.
    pub fn ensure_dir<T: AsRef<Path>>(&self, dir: T, verbose: bool) -> Result<()> {
        let dir = dir.as_ref();
        if self.exists(dir) {
            if !self.is_dir(dir)? {
                return Err(Error::NotDirectory(path_str(dir)?).into());
            }
            if verbose {
                eprintln!("Directory {:?} already exists. Not creating.", dir);
            }
        } else if self.dry_run {
            eprintln!("Dry run. Not creating directory {:?}", dir);
        } else {
            if verbose {
                eprintln!("Directory {:?} doesn't exist. Creating.", dir);
            }
            self.create_dir(dir)?;
        }
        Ok(())
    }

    /// Create a directory and any missing parents.
    pub fn create_dir<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        let path = path.as_ref();
        self.check_whitelist(path)?;
        fs::create_dir_all(path).with_context(|| format!("creating dir {:?}", path))?;
        Ok(())
    }

    /// Read entire file into a String.
    pub fn read_to_buf<T: AsRef<Path>>(&self, path: T, strbuf: &mut String) -> Result<()> {
        use std::io::Read;
        let path = path.as_ref();
        strbuf.clear();
        let cap = fs::metadata(path)?.len() as usize;
        if cap > strbuf.len() {
            strbuf.reserve(cap - strbuf.len());
        }
        let mut f = fs::File::open(path)?;
        f.read_to_string(strbuf)?;
        Ok(())
    }

    /// Files directly inside `dir` whose names end with `suffix`, sorted by name.
    pub fn list_files<T: AsRef<Path>>(&self, dir: T, suffix: &str) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        if !self.is_dir(dir)? {
            return Err(Error::MissingDirectory(path_str(dir)?).into());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("listing {:?}", dir))? {
            let entry = entry?;
            let matches = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(suffix));
            if matches && !entry.file_type()?.is_dir() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    fn is_whitelisted<T: AsRef<Path>>(&self, path: T) -> bool {
        let path = path.as_ref();
        self.writable.iter().any(|prefix| path.starts_with(prefix))
    }

    fn check_whitelist(&self, path: &Path) -> Result<()> {
        if self.dry_run || !self.is_whitelisted(path) {
            Err(Error::NotWhitelisted(path_str(path)?).into())
        } else {
            Ok(())
        }
    }
}

fn path_str(path: &Path) -> Result<String, PathEncodingError> {
    path.to_str()
        .map(str::to_owned)
        .ok_or_else(|| PathEncodingError(path.to_string_lossy().into_owned()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_list_files_sorted_and_filtered() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        for name in ["b_R1_001.fastq.gz", "a_R1_001.fastq.gz", "a_R2_001.fastq.gz", "x.txt"] {
            fs::write(tmp.path().join(name), "")?;
        }
        fs::create_dir(tmp.path().join("dir_R1_001.fastq.gz"))?;

        let fs = Fs::new(false);
        let files = fs.list_files(tmp.path(), "_R1_001.fastq.gz")?;
        let names: Vec<_> = files.iter().filter_map(|f| f.file_name()).collect();
        assert_eq!(vec!["a_R1_001.fastq.gz", "b_R1_001.fastq.gz"], names);

        let err = fs.list_files(tmp.path().join("nope"), "").unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::MissingDirectory(_))));
        Ok(())
    }

    #[test]
    fn test_create_dir_respects_whitelist() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let out = tmp.path().join("out");
        let mut fs = Fs::new(false);
        assert!(fs.create_dir(out.join("log")).is_err());

        fs.whitelist(&out);
        fs.ensure_dir(out.join("log"), false)?;
        assert!(out.join("log").is_dir());
        assert!(fs.create_dir(tmp.path().join("elsewhere")).is_err());
        Ok(())
    }

    #[test]
    fn test_dry_run_creates_nothing() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let mut fs = Fs::new(true);
        fs.whitelist(tmp.path());
        fs.ensure_dir(tmp.path().join("log"), false)?;
        assert!(!tmp.path().join("log").exists());
        assert!(fs.create_dir(tmp.path().join("log")).is_err());
        Ok(())
    }
}
