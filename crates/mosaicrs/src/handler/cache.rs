use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Output of one row transform as stored in the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRow {
    pub output: Value,
    /// Semantic role the transform assigned to its output column, if any.
    pub column_type: Option<String>,
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache lock poisoned")]
    Poisoned,

    #[error("cache backend unavailable: {0}")]
    Backend(String),
}

/// Storage behind the step handler's content-addressed cache.
///
/// Errors are reported to the handler, which degrades them to misses.
pub trait ResultCache: Send + Sync {
    fn get(&self, fingerprint: &str) -> Result<Option<CachedRow>, CacheError>;
    fn put(&self, fingerprint: String, row: CachedRow) -> Result<(), CacheError>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unbounded map that lives as long as its task. Nothing is ever evicted.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, CachedRow>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultCache for InMemoryCache {
    fn get(&self, fingerprint: &str) -> Result<Option<CachedRow>, CacheError> {
        let entries = self.entries.read().map_err(|_| CacheError::Poisoned)?;
        Ok(entries.get(fingerprint).cloned())
    }

    fn put(&self, fingerprint: String, row: CachedRow) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        entries.insert(fingerprint, row);
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }
}

/// Hit/miss counters accumulated over a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

/// Cache key for one item: SHA-256 over the step salt followed by the raw input.
pub fn fingerprint(salt: &str, input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update([0u8]);
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}
