//! Parse caches grouped by parser

use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use super::entry::CacheEntry;
use super::error::{CacheError, CacheResult};
use super::key::CacheKey;

/// Ordered parse results of one parser
#[derive(Debug, Default)]
pub struct ParserCache {
    entries: Vec<CacheEntry>,
}

impl ParserCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn add(&mut self, entry: CacheEntry) {
        self.entries.push(entry);
    }

    /// Entries in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, CacheEntry> {
        self.entries.iter()
    }

    /// Mutable entries in insertion order
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, CacheEntry> {
        self.entries.iter_mut()
    }

    /// Entry by position
    pub fn get(&self, index: usize) -> Option<&CacheEntry> {
        self.entries.get(index)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No entries yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a ParserCache {
    type Item = &'a CacheEntry;
    type IntoIter = std::slice::Iter<'a, CacheEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// One [`ParserCache`] per registered parser, plus the digest key
#[derive(Debug)]
pub struct CacheRegistry {
    caches: IndexMap<String, ParserCache>,
    key: CacheKey,
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new(CacheKey::generate())
    }
}

impl CacheRegistry {
    /// Create an empty registry using `key` for persisted entries
    pub fn new(key: CacheKey) -> Self {
        Self {
            caches: IndexMap::new(),
            key,
        }
    }

    /// Digest key
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Register a cache for a parser
    pub fn add(&mut self, parser_id: &str) -> CacheResult<()> {
        if self.caches.contains_key(parser_id) {
            return Err(CacheError::DuplicateParser {
                id: parser_id.to_string(),
            });
        }
        self.caches.insert(parser_id.to_string(), ParserCache::new());
        Ok(())
    }

    /// Remove a parser's cache
    pub fn drop_parser(&mut self, parser_id: &str) -> CacheResult<ParserCache> {
        self.caches
            .shift_remove(parser_id)
            .ok_or_else(|| CacheError::UnknownParser {
                id: parser_id.to_string(),
            })
    }

    /// Cache of a parser
    pub fn get(&self, parser_id: &str) -> Option<&ParserCache> {
        self.caches.get(parser_id)
    }

    /// Mutable cache of a parser
    pub fn get_mut(&mut self, parser_id: &str) -> CacheResult<&mut ParserCache> {
        self.caches
            .get_mut(parser_id)
            .ok_or_else(|| CacheError::UnknownParser {
                id: parser_id.to_string(),
            })
    }

    /// Whether a parser has a cache
    pub fn contains(&self, parser_id: &str) -> bool {
        self.caches.contains_key(parser_id)
    }

    /// Parser identifiers in registration order
    pub fn parser_ids(&self) -> impl Iterator<Item = &str> {
        self.caches.keys().map(String::as_str)
    }

    /// All caches in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParserCache)> {
        self.caches.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Total number of entries across parsers
    pub fn entry_count(&self) -> usize {
        self.caches.values().map(ParserCache::len).sum()
    }

    /// No parse results at all
    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }

    /// Load an entry's value with this registry's key
    pub fn load(&self, entry: &CacheEntry) -> CacheResult<Arc<Value>> {
        entry.load(&self.key)
    }

    /// Persisted files of every entry
    pub fn persisted_files(&self) -> Vec<PathBuf> {
        self.caches
            .values()
            .flat_map(ParserCache::iter)
            .flat_map(CacheEntry::persisted_files)
            .collect()
    }
}
