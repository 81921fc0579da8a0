//! Per-file parse results with optional tamper-checked persistence

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{CacheError, CacheResult};
use super::key::{CacheKey, DIGEST_ALGORITHM, NONCE_LEN};

/// Suffix of a persisted result, written as `<file>.<parser_id>.meta.json`
pub const META_SUFFIX: &str = ".meta.json";
/// Suffix appended to a persisted result for its signature
pub const SIGNATURE_SUFFIX: &str = ".sig";

/// Digest record stored next to a persisted result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Digest algorithm label
    pub algorithm: String,
    /// Hex-encoded random nonce
    pub nonce: String,
    /// Hex-encoded digest of `nonce || bytes`
    pub digest: String,
}

/// One parser's result for one file
#[derive(Debug)]
pub struct CacheEntry {
    parser_id: String,
    explored_path: PathBuf,
    file_path: PathBuf,
    rel_path: PathBuf,
    meta_path: PathBuf,
    metadata: Mutex<Option<Arc<Value>>>,
    signature: Option<Signature>,
}

impl CacheEntry {
    /// Entry holding a freshly parsed value in memory
    pub fn new(
        parser_id: impl Into<String>,
        explored_path: impl Into<PathBuf>,
        file_path: impl Into<PathBuf>,
        metadata: Value,
    ) -> Self {
        let mut entry = Self::empty(parser_id.into(), explored_path.into(), file_path.into());
        entry.metadata = Mutex::new(Some(Arc::new(metadata)));
        entry
    }

    /// Rebuild an entry from a previously persisted result and its signature
    pub fn restore(
        parser_id: impl Into<String>,
        explored_path: impl Into<PathBuf>,
        file_path: impl Into<PathBuf>,
    ) -> CacheResult<Self> {
        let mut entry = Self::empty(parser_id.into(), explored_path.into(), file_path.into());
        let signature_path = entry.signature_path();
        let bytes = fs::read(&signature_path).map_err(|e| CacheError::io(&signature_path, e))?;
        let signature: Signature =
            serde_json::from_slice(&bytes).map_err(|e| CacheError::InvalidSignature {
                path: signature_path.display().to_string(),
                reason: e.to_string(),
            })?;
        entry.signature = Some(signature);
        Ok(entry)
    }

    fn empty(parser_id: String, explored_path: PathBuf, file_path: PathBuf) -> Self {
        let rel_path = file_path
            .strip_prefix(&explored_path)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| file_path.file_name().map(PathBuf::from).unwrap_or_default());
        // One file may be routed to several parsers
        let mut meta_name = file_path.as_os_str().to_owned();
        meta_name.push(format!(".{parser_id}{META_SUFFIX}"));

        Self {
            parser_id,
            explored_path,
            rel_path,
            meta_path: PathBuf::from(meta_name),
            file_path,
            metadata: Mutex::new(None),
            signature: None,
        }
    }

    /// Parser that produced the result
    pub fn parser_id(&self) -> &str {
        &self.parser_id
    }

    /// Root of the exploration that found the file
    pub fn explored_path(&self) -> &Path {
        &self.explored_path
    }

    /// Parsed file
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Parsed file relative to the explored root
    pub fn rel_path(&self) -> &Path {
        &self.rel_path
    }

    /// Location of the persisted result
    pub fn meta_path(&self) -> &Path {
        &self.meta_path
    }

    /// Location of the signature sidecar
    pub fn signature_path(&self) -> PathBuf {
        let mut name = self.meta_path.as_os_str().to_owned();
        name.push(SIGNATURE_SUFFIX);
        PathBuf::from(name)
    }

    /// Recorded signature, present once saved or restored
    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// Whether the value is currently held in memory
    pub fn is_loaded(&self) -> bool {
        self.metadata.lock().is_some()
    }

    /// Whether the value has been persisted
    pub fn is_persisted(&self) -> bool {
        self.signature.is_some()
    }

    /// Persist the value with its digest and release it from memory
    pub fn save(&mut self, key: &CacheKey, overwrite: bool) -> CacheResult<()> {
        let value = self
            .metadata
            .lock()
            .clone()
            .ok_or_else(|| CacheError::NothingToSave {
                path: self.file_path.display().to_string(),
            })?;

        if self.meta_path.exists() {
            if !overwrite {
                return Err(CacheError::AlreadyExists {
                    path: self.meta_path.display().to_string(),
                });
            }
            warn!("Overwriting existing file: {}", self.meta_path.display());
        }

        let bytes = serde_json::to_vec(value.as_ref()).map_err(|e| CacheError::serialization(&self.meta_path, e))?;
        let nonce = rand::random::<[u8; NONCE_LEN]>();
        let digest = key.digest(&nonce, &bytes)?;
        let signature = Signature {
            algorithm: DIGEST_ALGORITHM.to_string(),
            nonce: hex::encode(nonce),
            digest: hex::encode(digest),
        };

        fs::write(&self.meta_path, &bytes).map_err(|e| CacheError::io(&self.meta_path, e))?;
        let signature_path = self.signature_path();
        let signature_bytes =
            serde_json::to_vec_pretty(&signature).map_err(|e| CacheError::serialization(&signature_path, e))?;
        fs::write(&signature_path, signature_bytes).map_err(|e| CacheError::io(&signature_path, e))?;

        debug!("Saved {}", self.meta_path.display());
        self.signature = Some(signature);
        *self.metadata.lock() = None;
        Ok(())
    }

    /// Return the value, reading and verifying the persisted copy if needed
    pub fn load(&self, key: &CacheKey) -> CacheResult<Arc<Value>> {
        if let Some(value) = self.metadata.lock().as_ref() {
            return Ok(Arc::clone(value));
        }

        let path = self.meta_path.display().to_string();
        let signature = self
            .signature
            .as_ref()
            .ok_or_else(|| CacheError::MissingDigest { path: path.clone() })?;
        if signature.algorithm != DIGEST_ALGORITHM {
            return Err(CacheError::InvalidSignature {
                path,
                reason: format!("unsupported algorithm '{}'", signature.algorithm),
            });
        }
        let invalid = |e: hex::FromHexError| CacheError::InvalidSignature {
            path: path.clone(),
            reason: e.to_string(),
        };
        let nonce = hex::decode(&signature.nonce).map_err(invalid)?;
        let expected = hex::decode(&signature.digest).map_err(invalid)?;

        let bytes = fs::read(&self.meta_path).map_err(|e| CacheError::io(&self.meta_path, e))?;
        if !key.verify(&nonce, &bytes, &expected)? {
            return Err(CacheError::IntegrityViolation { path });
        }

        let value: Value = serde_json::from_slice(&bytes).map_err(|e| CacheError::serialization(&self.meta_path, e))?;
        let value = Arc::new(value);
        *self.metadata.lock() = Some(Arc::clone(&value));
        debug!("Loaded {}", self.meta_path.display());
        Ok(value)
    }

    /// Drop the in-memory value of a persisted entry
    pub fn release(&self) {
        if self.is_persisted() {
            *self.metadata.lock() = None;
        }
    }

    /// Remove the persisted result and its signature
    ///
    /// Failures are logged; the entry can no longer be loaded afterwards.
    pub fn discard(&self) {
        for path in self.persisted_files() {
            if let Err(err) = fs::remove_file(&path) {
                warn!("Failed to remove {}: {err}", path.display());
            }
        }
    }

    /// Persisted files of this entry that exist on disk
    pub fn persisted_files(&self) -> Vec<PathBuf> {
        [self.meta_path.clone(), self.signature_path()]
            .into_iter()
            .filter(|p| p.is_file())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("station_1").join("x.yml");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "a: 1").unwrap();
        (dir, file)
    }

    #[test]
    fn test_paths() {
        let (dir, file) = fixture();
        let entry = CacheEntry::new("yml", dir.path(), &file, json!(1));
        assert_eq!(entry.rel_path(), Path::new("station_1/x.yml"));
        assert_eq!(entry.parser_id(), "yml");
        assert!(entry.meta_path().to_string_lossy().ends_with("x.yml.yml.meta.json"));
        assert!(entry.signature_path().to_string_lossy().ends_with("x.yml.yml.meta.json.sig"));
    }

    #[test]
    fn test_parsers_persist_same_file_separately() {
        let (dir, file) = fixture();
        let key = CacheKey::generate();
        let mut env = CacheEntry::new("env", dir.path(), &file, json!({"from": "env"}));
        let mut raw = CacheEntry::new("raw", dir.path(), &file, json!({"from": "raw"}));
        assert_ne!(env.meta_path(), raw.meta_path());

        env.save(&key, false).unwrap();
        raw.save(&key, false).unwrap();
        assert_eq!(*env.load(&key).unwrap(), json!({"from": "env"}));
        assert_eq!(*raw.load(&key).unwrap(), json!({"from": "raw"}));
    }

    #[test]
    fn test_save_load_round_trip() {
        let (dir, file) = fixture();
        let key = CacheKey::generate();
        let value = json!({"real": "1.2", "nested": {"list": [1, 2.5, null]}});
        let mut entry = CacheEntry::new("yml", dir.path(), &file, value.clone());

        entry.save(&key, false).unwrap();
        assert!(!entry.is_loaded());
        assert!(entry.meta_path().is_file());

        assert_eq!(*entry.load(&key).unwrap(), value);
        assert!(entry.is_loaded());
    }

    #[test]
    fn test_tampered_bytes_rejected() {
        let (dir, file) = fixture();
        let key = CacheKey::generate();
        let mut entry = CacheEntry::new("yml", dir.path(), &file, json!({"real": "1.2"}));
        entry.save(&key, false).unwrap();

        let mut bytes = fs::read(entry.meta_path()).unwrap();
        bytes[3] ^= 0x01;
        fs::write(entry.meta_path(), bytes).unwrap();

        assert!(matches!(entry.load(&key), Err(CacheError::IntegrityViolation { .. })));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let (dir, file) = fixture();
        let mut entry = CacheEntry::new("yml", dir.path(), &file, json!([1, 2]));
        entry.save(&CacheKey::generate(), false).unwrap();
        assert!(matches!(
            entry.load(&CacheKey::generate()),
            Err(CacheError::IntegrityViolation { .. })
        ));
    }

    #[test]
    fn test_never_saved_without_value() {
        let (dir, file) = fixture();
        let entry = CacheEntry::empty("yml".to_string(), dir.path().to_path_buf(), file);
        assert!(matches!(
            entry.load(&CacheKey::generate()),
            Err(CacheError::MissingDigest { .. })
        ));
    }

    #[test]
    fn test_overwrite_flag() {
        let (dir, file) = fixture();
        let key = CacheKey::generate();
        let mut first = CacheEntry::new("yml", dir.path(), &file, json!(1));
        first.save(&key, false).unwrap();

        let mut second = CacheEntry::new("yml", dir.path(), &file, json!(2));
        assert!(matches!(second.save(&key, false), Err(CacheError::AlreadyExists { .. })));
        assert_eq!(*first.load(&key).unwrap(), json!(1));
        second.save(&key, true).unwrap();
        assert_eq!(*second.load(&key).unwrap(), json!(2));
    }

    #[test]
    fn test_restore_in_new_entry() {
        let (dir, file) = fixture();
        let key = CacheKey::generate();
        let mut entry = CacheEntry::new("yml", dir.path(), &file, json!({"user": "0.5"}));
        entry.save(&key, false).unwrap();
        drop(entry);

        let restored = CacheEntry::restore("yml", dir.path(), &file).unwrap();
        assert_eq!(*restored.load(&key).unwrap(), json!({"user": "0.5"}));
        assert_eq!(restored.persisted_files().len(), 2);
    }
}
