//! Data file discovery.
//!
//! When no files are named on the command line the newest instrument
//! file in the configured data directory is used.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

/// Configuration for locating data files.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Directory holding the instrument files.
    pub data_path: PathBuf,
    /// Required file name suffix, e.g. ".dat".
    pub file_ext: String,
}

impl From<&crate::config::GeneralConfig> for ScanConfig {
    fn from(config: &crate::config::GeneralConfig) -> Self {
        Self {
            data_path: PathBuf::from(&config.data_path),
            file_ext: config.file_ext.clone(),
        }
    }
}

/// A data file with its age stamp.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub stamp: SystemTime,
}

/// Finds instrument files in a single directory (no recursion).
pub struct FileScanner {
    config: ScanConfig,
}

impl FileScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// All matching files, in directory order.
    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.config.data_path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
        {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.matches(entry.path()) {
                continue;
            }

            let metadata = entry.metadata()?;
            // Creation time is not available everywhere.
            let stamp = metadata.created().or_else(|_| metadata.modified())?;

            files.push(ScannedFile {
                path: entry.into_path(),
                stamp,
            });
        }

        Ok(files)
    }

    /// The most recently created matching file.
    pub fn newest(&self) -> Result<PathBuf> {
        latest(self.scan()?).ok_or_else(|| {
            anyhow!(
                "No '*{}' files found in {}",
                self.config.file_ext,
                self.config.data_path.display()
            )
        })
    }

    /// Whether a file name ends with the configured suffix.
    fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with(&self.config.file_ext))
    }
}

/// Path of the file with the latest stamp.
fn latest(files: Vec<ScannedFile>) -> Option<PathBuf> {
    files.into_iter().max_by_key(|f| f.stamp).map(|f| f.path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scanner(dir: &Path, ext: &str) -> FileScanner {
        FileScanner::new(ScanConfig {
            data_path: dir.to_path_buf(),
            file_ext: ext.to_string(),
        })
    }

    #[test]
    fn test_scan_filters_by_suffix_and_depth() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("AE33_a.dat"), "x").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("old")).unwrap();
        fs::write(dir.path().join("old").join("AE33_b.dat"), "x").unwrap();

        let files = scanner(dir.path(), ".dat").scan().unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("AE33_a.dat"));
    }

    #[test]
    fn test_latest_uses_stamp_not_name() {
        let now = SystemTime::now();
        let hour = std::time::Duration::from_secs(3600);
        let files = vec![
            ScannedFile { path: PathBuf::from("AE33_9.dat"), stamp: now - hour },
            ScannedFile { path: PathBuf::from("AE33_1.dat"), stamp: now },
            ScannedFile { path: PathBuf::from("AE33_5.dat"), stamp: now - hour * 2 },
        ];
        assert_eq!(latest(files), Some(PathBuf::from("AE33_1.dat")));
        assert_eq!(latest(Vec::new()), None);
    }

    #[test]
    fn test_newest_finds_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let only = dir.path().join("AE33_20190514.dat");
        fs::write(&only, "x").unwrap();

        assert_eq!(scanner(dir.path(), ".dat").newest().unwrap(), only);
    }

    #[test]
    fn test_newest_without_matches_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("readme.md"), "x").unwrap();

        let err = scanner(dir.path(), ".dat").newest().unwrap_err();
        assert!(err.to_string().contains("*.dat"));
    }
}
