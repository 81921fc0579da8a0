//! Parse result cache
//!
//! Results are kept per parser and per file. In lazy mode each result is
//! written next to its source file as `<file>.<parser_id>.meta.json`, signed
//! with an HMAC-SHA3-256 digest stored in a `.sig` sidecar, and dropped from
//! memory. Loading verifies the digest in constant time before deserializing.

pub mod entry;
pub mod error;
pub mod key;
pub mod registry;

pub use entry::{CacheEntry, META_SUFFIX, SIGNATURE_SUFFIX, Signature};
pub use error::{CacheError, CacheResult};
pub use key::{CacheKey, DIGEST_ALGORITHM};
pub use registry::{CacheRegistry, ParserCache};
