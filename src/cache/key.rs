//! Keyed digests for persisted cache entries

use std::fmt;

use hmac::{Hmac, Mac};
use sha3::Sha3_256;
use subtle::ConstantTimeEq;

use super::error::{CacheError, CacheResult};

type HmacSha3_256 = Hmac<Sha3_256>;

/// Algorithm label written to signature files
pub const DIGEST_ALGORITHM: &str = "hmac-sha3-256";

/// Length of generated keys and nonces
pub const KEY_LEN: usize = 32;
/// Length of per-entry nonces
pub const NONCE_LEN: usize = 16;

/// Secret key for cache digests
#[derive(Clone, PartialEq, Eq)]
pub struct CacheKey(Vec<u8>);

impl CacheKey {
    /// Random key
    pub fn generate() -> Self {
        Self(rand::random::<[u8; KEY_LEN]>().to_vec())
    }

    /// Key from raw bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> CacheResult<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(CacheError::InvalidKey {
                reason: "key must not be empty".to_string(),
            });
        }
        Ok(Self(bytes))
    }

    /// Key from a hex string
    pub fn from_hex(text: &str) -> CacheResult<Self> {
        let bytes = hex::decode(text.trim()).map_err(|e| CacheError::InvalidKey {
            reason: e.to_string(),
        })?;
        Self::from_bytes(bytes)
    }

    /// Hex encoding of the key
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Digest of `nonce || payload`
    pub fn digest(&self, nonce: &[u8], payload: &[u8]) -> CacheResult<Vec<u8>> {
        let mut mac = HmacSha3_256::new_from_slice(&self.0).map_err(|e| CacheError::InvalidKey {
            reason: e.to_string(),
        })?;
        mac.update(nonce);
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Constant-time check of a recorded digest
    pub fn verify(&self, nonce: &[u8], payload: &[u8], expected: &[u8]) -> CacheResult<bool> {
        let actual = self.digest(nonce, payload)?;
        if actual.len() != expected.len() {
            return Ok(false);
        }
        Ok(actual.ct_eq(expected).into())
    }
}

impl Default for CacheKey {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CacheKey(<redacted>)")
    }
}
