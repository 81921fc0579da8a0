//! Archivist configuration

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::cache::{CacheError, CacheKey};
use crate::compiler::CompileOptions;
use crate::exporter::ExportFormat;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Reading the file failed
    #[error("Failed to read configuration {path}: {message}")]
    Io {
        /// File path
        path: String,
        /// OS message
        message: String,
    },

    /// File content is not a valid configuration
    #[error("Invalid configuration {path}: {message}")]
    Invalid {
        /// File path
        path: String,
        /// Decoder message
        message: String,
    },

    /// Extension is neither JSON nor YAML
    #[error("Unsupported configuration format: {path}")]
    UnsupportedFormat {
        /// File path
        path: String,
    },

    /// Cache key could not be decoded
    #[error(transparent)]
    CacheKey(#[from] CacheError),
}

/// Runtime options of an archiving run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchivistConfig {
    /// Directory receiving the exported metadata
    pub output_directory: PathBuf,
    /// Exported file name
    pub output_file: String,
    /// Exported format
    pub output_format: ExportFormat,
    /// Persist parse results and drop them from memory
    pub lazy_load: bool,
    /// Replace existing files
    pub overwrite: bool,
    /// Delete persisted parse results after compilation
    pub auto_cleanup: bool,
    /// Copy schema descriptions into the metadata
    pub add_description: bool,
    /// Copy schema types into the metadata
    pub add_type: bool,
    /// Hex digest key for persisted parse results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
}

impl Default for ArchivistConfig {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("."),
            output_file: "metadata.json".to_string(),
            output_format: ExportFormat::Json,
            lazy_load: false,
            overwrite: true,
            auto_cleanup: true,
            add_description: false,
            add_type: false,
            cache_key: None,
        }
    }
}

const KNOWN_KEYS: &[&str] = &[
    "output_directory",
    "output_file",
    "output_format",
    "lazy_load",
    "overwrite",
    "auto_cleanup",
    "add_description",
    "add_type",
    "cache_key",
];

impl ArchivistConfig {
    /// Load a JSON or YAML configuration file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let value: Value = match extension.as_deref() {
            Some("json") => serde_json::from_str(&text).map_err(|e| invalid(path, e))?,
            Some("yml" | "yaml") => serde_yaml::from_str(&text).map_err(|e| invalid(path, e))?,
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    path: path.display().to_string(),
                });
            }
        };
        Self::from_value(value).map_err(|e| match e {
            ConfigError::Invalid { message, .. } => ConfigError::Invalid {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// Build a configuration from a decoded document, ignoring unknown keys
    pub fn from_value(mut value: Value) -> ConfigResult<Self> {
        if let Value::Object(object) = &mut value {
            object.retain(|key, _| {
                let known = KNOWN_KEYS.contains(&key.as_str());
                if !known {
                    warn!("Ignoring unknown configuration key '{key}'");
                }
                known
            });
        }
        serde_json::from_value(value).map_err(|e| ConfigError::Invalid {
            path: String::new(),
            message: e.to_string(),
        })
    }

    /// Compilation options implied by this configuration
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            add_description: self.add_description,
            add_type: self.add_type,
            ..Default::default()
        }
    }

    /// Digest key for persisted parse results; random when not configured
    pub fn cache_key(&self) -> ConfigResult<CacheKey> {
        match &self.cache_key {
            Some(hex) => Ok(CacheKey::from_hex(hex)?),
            None => Ok(CacheKey::generate()),
        }
    }
}

fn invalid(path: &Path, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}
