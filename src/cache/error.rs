//! Parse cache errors

use thiserror::Error;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors raised by the parse cache
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    /// Persisted entry has no recorded digest
    #[error("No integrity digest recorded for {path}; the entry was never saved")]
    MissingDigest {
        /// Persisted file
        path: String,
    },

    /// Persisted bytes do not reproduce the recorded digest
    #[error("Integrity check failed for {path}: cache file was modified after it was written")]
    IntegrityViolation {
        /// Persisted file
        path: String,
    },

    /// Persisted file exists and overwriting is disabled
    #[error("Cache file already exists: {path}")]
    AlreadyExists {
        /// Persisted file
        path: String,
    },

    /// Entry holds no value to save
    #[error("Cache entry for {path} holds no value")]
    NothingToSave {
        /// Parsed file
        path: String,
    },

    /// Signature sidecar is unreadable or inconsistent
    #[error("Invalid signature for {path}: {reason}")]
    InvalidSignature {
        /// Persisted file
        path: String,
        /// What is wrong with it
        reason: String,
    },

    /// Key material rejected
    #[error("Invalid cache key: {reason}")]
    InvalidKey {
        /// What is wrong with it
        reason: String,
    },

    /// Filesystem failure
    #[error("I/O error on {path}: {message}")]
    Io {
        /// File involved
        path: String,
        /// OS message
        message: String,
    },

    /// Value could not be (de)serialized
    #[error("Serialization error on {path}: {message}")]
    Serialization {
        /// File involved
        path: String,
        /// Serializer message
        message: String,
    },

    /// Parser identifier not registered
    #[error("No cache registered for parser '{id}'")]
    UnknownParser {
        /// Parser identifier
        id: String,
    },

    /// Parser identifier registered twice
    #[error("A cache is already registered for parser '{id}'")]
    DuplicateParser {
        /// Parser identifier
        id: String,
    },
}

impl CacheError {
    pub(crate) fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        CacheError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn serialization(path: &std::path::Path, err: serde_json::Error) -> Self {
        CacheError::Serialization {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}
