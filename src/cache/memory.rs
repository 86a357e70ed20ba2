//! In-memory cache store.
//!
//! Same contract as the file store but process-local; used where nothing
//! should touch the disk.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

use super::staleness::DEFAULT_TTL;
use super::{CacheError, CacheKey, CacheStore};

struct MemoryEntry {
    captured_at: Instant,
    repos: Vec<Value>,
}

/// Cache store backed by a concurrent map.
pub struct MemoryCache {
    entries: DashMap<CacheKey, MemoryEntry>,
    ttl: Duration,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    /// Create a memory cache with the default TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create a memory cache with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Whether a fresh entry exists for `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.read(key).is_some()
    }
}

impl CacheStore for MemoryCache {
    fn read(&self, key: &CacheKey) -> Option<Vec<Value>> {
        if let Some(entry) = self.entries.get(key) {
            if entry.captured_at.elapsed() < self.ttl {
                return Some(entry.repos.clone());
            }
        }
        // Re-checked under the shard lock so a concurrent rewrite survives.
        self.entries
            .remove_if(key, |_, entry| entry.captured_at.elapsed() >= self.ttl);
        None
    }

    fn write(&self, key: &CacheKey, repos: &[Value]) -> Result<(), CacheError> {
        self.entries.insert(
            key.clone(),
            MemoryEntry {
                captured_at: Instant::now(),
                repos: repos.to_vec(),
            },
        );
        Ok(())
    }

    fn purge(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}
