use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use logai_logging::logai_info;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::filename::report_filename;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("report directory missing or not writable: {0}")]
    ReportDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure the report directory exists; create if missing.
pub fn ensure_report_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::ReportDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::ReportDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::ReportDir(e.to_string()))?;
    }
    Ok(())
}

/// Saves markdown reports into one directory, one file per analyzed log.
///
/// Writes go to a temp file in the same directory which is then renamed over
/// the target, so a reader never sees a half-written report.
#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a report for `file_name` is saved under.
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(report_filename(file_name))
    }

    /// Saves `markdown` as the report for `file_name`, replacing any earlier one.
    pub fn save(&self, file_name: &str, markdown: &str) -> Result<PathBuf, PersistError> {
        ensure_report_dir(&self.dir)?;

        let target = self.path_for(file_name);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(markdown.as_bytes())?;
        if !markdown.ends_with('\n') {
            tmp.write_all(b"\n")?;
        }
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;

        logai_info!("saved report for {} to {:?}", file_name, target);
        Ok(target)
    }
}

/// One-shot form of [`ReportStore::save`].
pub fn save_report(dir: &Path, file_name: &str, markdown: &str) -> Result<PathBuf, PersistError> {
    ReportStore::new(dir).save(file_name, markdown)
}
