//! File discovery

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;
use walkdir::WalkDir;

use crate::cache::{META_SUFFIX, SIGNATURE_SUFFIX};
use crate::pattern::{PatternError, path_matches};

/// Result type for exploration
pub type ExploreResult<T> = Result<T, ExploreError>;

/// Exploration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExploreError {
    /// Root does not exist
    #[error("Path not found: {path}")]
    NotFound {
        /// Root path
        path: String,
    },

    /// Root is not a directory
    #[error("Not a directory: {path}")]
    NotADirectory {
        /// Root path
        path: String,
    },

    /// Directory traversal failed
    #[error("Failed to walk {path}: {message}")]
    Walk {
        /// Path being visited
        path: String,
        /// Traversal message
        message: String,
    },

    /// Invalid file pattern
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Files found by an explorer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exploration {
    /// Root the files are relative to
    pub root: PathBuf,
    /// Directories holding at least one matched file
    pub directories: Vec<PathBuf>,
    /// Matched files
    pub files: Vec<PathBuf>,
}

/// Source of files to parse
pub trait Explorer {
    /// Find the files whose path relative to the root matches any pattern
    fn explore(&self, patterns: &[&str]) -> ExploreResult<Exploration>;
}

/// Recursive walk over a plain directory
#[derive(Debug, Clone)]
pub struct DirectoryExplorer {
    root: PathBuf,
    follow_links: bool,
}

impl DirectoryExplorer {
    /// Explore `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_links: false,
        }
    }

    /// Follow symbolic links while walking
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn is_cache_artifact(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(META_SUFFIX) || name.ends_with(&format!("{META_SUFFIX}{SIGNATURE_SUFFIX}")))
}

impl Explorer for DirectoryExplorer {
    fn explore(&self, patterns: &[&str]) -> ExploreResult<Exploration> {
        if !self.root.exists() {
            return Err(ExploreError::NotFound {
                path: self.root.display().to_string(),
            });
        }
        if !self.root.is_dir() {
            return Err(ExploreError::NotADirectory {
                path: self.root.display().to_string(),
            });
        }

        let mut files = Vec::new();
        let mut directories = BTreeSet::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(self.follow_links)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|e| ExploreError::Walk {
                path: e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| self.root.display().to_string()),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() || is_cache_artifact(entry.path()) {
                continue;
            }

            let rel_path = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            let mut matched = false;
            for pattern in patterns {
                if path_matches(pattern, rel_path, None)? {
                    matched = true;
                    break;
                }
            }
            if matched {
                if let Some(parent) = entry.path().parent() {
                    directories.insert(parent.to_path_buf());
                }
                files.push(entry.into_path());
            }
        }

        debug!("Explored {}: {} matching files", self.root.display(), files.len());
        Ok(Exploration {
            root: self.root.clone(),
            directories: directories.into_iter().collect(),
            files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn test_explore_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for station in ["station_2", "station_1"] {
            fs::create_dir(dir.path().join(station)).unwrap();
            fs::write(dir.path().join(station).join("x.yml"), "a: 1").unwrap();
            fs::write(dir.path().join(station).join("notes.txt"), "").unwrap();
        }
        fs::write(dir.path().join("station_1/x.yml.stations.meta.json"), "{}").unwrap();
        fs::write(dir.path().join("station_1/x.yml.stations.meta.json.sig"), "{}").unwrap();

        let exploration = DirectoryExplorer::new(dir.path()).explore(&[r"x\.yml"]).unwrap();
        assert_eq!(
            exploration.files,
            vec![
                dir.path().join("station_1/x.yml"),
                dir.path().join("station_2/x.yml")
            ]
        );
        assert_eq!(
            exploration.directories,
            vec![dir.path().join("station_1"), dir.path().join("station_2")]
        );
    }

    #[test]
    fn test_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = DirectoryExplorer::new(dir.path().join("nope"))
            .explore(&[".*"])
            .unwrap_err();
        assert!(matches!(err, ExploreError::NotFound { .. }));
    }
}
