//! Metadata export

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::ArchivistConfig;

/// Result type for export
pub type ExportResult<T> = Result<T, ExportError>;

/// Export errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExportError {
    /// Target exists and is not a regular file
    #[error("Export target {path} exists and is not a file")]
    NotAFile {
        /// Target path
        path: String,
    },

    /// Target exists and overwriting is disabled
    #[error("Export target {path} already exists and overwrite is disabled")]
    AlreadyExists {
        /// Target path
        path: String,
    },

    /// Filesystem failure
    #[error("Failed to write {path}: {message}")]
    Io {
        /// Path involved
        path: String,
        /// OS message
        message: String,
    },

    /// Encoding failure
    #[error("Failed to encode metadata as {format}: {message}")]
    Encode {
        /// Target format
        format: ExportFormat,
        /// Encoder message
        message: String,
    },
}

/// Output format of the compiled metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// YAML
    Yaml,
}

impl ExportFormat {
    /// Encode a document
    pub fn encode(self, value: &Value) -> ExportResult<String> {
        let encoded = match self {
            ExportFormat::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
            ExportFormat::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        };
        encoded.map_err(|message| ExportError::Encode { format: self, message })
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Json => "json",
            ExportFormat::Yaml => "yaml",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "yaml" | "yml" => Ok(ExportFormat::Yaml),
            other => Err(format!("unsupported export format '{other}'")),
        }
    }
}

/// Writes compiled metadata to disk
#[derive(Debug, Clone, PartialEq)]
pub struct Exporter {
    directory: PathBuf,
    file_name: String,
    format: ExportFormat,
    overwrite: bool,
}

impl Exporter {
    /// Create an exporter
    pub fn new(directory: impl Into<PathBuf>, file_name: impl Into<String>, format: ExportFormat, overwrite: bool) -> Self {
        Self {
            directory: directory.into(),
            file_name: file_name.into(),
            format,
            overwrite,
        }
    }

    /// Exporter configured from the archivist configuration
    pub fn from_config(config: &ArchivistConfig) -> Self {
        Self::new(
            &config.output_directory,
            &config.output_file,
            config.output_format,
            config.overwrite,
        )
    }

    /// Output file path
    pub fn target(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    /// Write `value` and return the written path
    pub fn export(&self, value: &Value) -> ExportResult<PathBuf> {
        fs::create_dir_all(&self.directory).map_err(|e| io_error(&self.directory, e))?;

        let target = self.target();
        if target.exists() {
            if !target.is_file() {
                return Err(ExportError::NotAFile {
                    path: target.display().to_string(),
                });
            }
            if !self.overwrite {
                return Err(ExportError::AlreadyExists {
                    path: target.display().to_string(),
                });
            }
            warn!("Overwriting existing file {}", target.display());
        }

        let encoded = self.format.encode(value)?;
        fs::write(&target, encoded).map_err(|e| io_error(&target, e))?;
        info!("Metadata exported to {}", target.display());
        Ok(target)
    }
}

fn io_error(path: &Path, err: std::io::Error) -> ExportError {
    ExportError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}
