//! File-backed cache store.
//!
//! Each (account, category) pair lives in its own JSON file holding the
//! capture time and the raw payloads exactly as the API returned them.

use std::io;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::paths::is_cache_file;
use super::staleness::{self, DEFAULT_TTL};
use super::swap::{atomic_write, remove_if_exists};
use super::{CacheError, CacheKey, CachePaths, CacheStore};

/// On-disk layout of one cache entry.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile<R> {
    account: String,
    category: String,
    captured_at_ms: u64,
    repos: R,
}

/// A cache file found on disk.
#[derive(Debug, Clone)]
pub struct CacheFileInfo {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
    /// Time since the file was last written.
    pub age: Duration,
}

/// Cache store writing one JSON file per key under a root directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    paths: CachePaths,
    ttl: Duration,
}

impl FileCache {
    /// Create a file cache with the default TTL.
    pub fn new(paths: CachePaths) -> Self {
        Self {
            paths,
            ttl: DEFAULT_TTL,
        }
    }

    /// Set the maximum age at which entries are still returned.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn paths(&self) -> &CachePaths {
        &self.paths
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn read_at(&self, key: &CacheKey, now: SystemTime) -> Option<Vec<Value>> {
        let path = self.paths.entry_file(key);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("Failed to read cache file {}: {}", path.display(), e);
                return None;
            }
        };

        let entry: CacheFile<Vec<Value>> = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("Ignoring corrupt cache file {}: {}", path.display(), e);
                return None;
            }
        };

        if !staleness::is_fresh(entry.captured_at_ms, now, self.ttl) {
            log::debug!("Cache entry for {} expired", key);
            return None;
        }

        Some(entry.repos)
    }

    fn write_at(&self, key: &CacheKey, repos: &[Value], now: SystemTime) -> Result<(), CacheError> {
        let entry = CacheFile {
            account: key.account.to_string(),
            category: key.category.to_string(),
            captured_at_ms: staleness::to_millis(now),
            repos,
        };
        let bytes = serde_json::to_vec_pretty(&entry)?;
        atomic_write(&self.paths.entry_file(key), &bytes)?;
        log::debug!("Cached {} repositories for {}", repos.len(), key);
        Ok(())
    }

    /// List every cache file under the root, sorted by name. Temp files left
    /// by an interrupted write are included so they can be purged.
    pub fn entries(&self) -> Result<Vec<CacheFileInfo>, CacheError> {
        let dir = match std::fs::read_dir(self.paths.root()) {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let now = SystemTime::now();
        let mut entries = Vec::new();
        for entry in dir.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_cache_file(&name) {
                continue;
            }
            let meta = match entry.metadata() {
                Ok(meta) if meta.is_file() => meta,
                _ => continue,
            };
            let age = meta
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or(Duration::ZERO);
            entries.push(CacheFileInfo {
                path: entry.path(),
                name,
                size_bytes: meta.len(),
                age,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Remove every cache file, returning how many were removed.
    pub fn purge_all(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for entry in self.entries()? {
            if remove_if_exists(&entry.path)? {
                removed += 1;
            }
        }
        log::info!("Purged {} cache files", removed);
        Ok(removed)
    }
}

impl CacheStore for FileCache {
    fn read(&self, key: &CacheKey) -> Option<Vec<Value>> {
        self.read_at(key, SystemTime::now())
    }

    fn write(&self, key: &CacheKey, repos: &[Value]) -> Result<(), CacheError> {
        self.write_at(key, repos, SystemTime::now())
    }

    fn purge(&self, key: &CacheKey) -> Result<(), CacheError> {
        if remove_if_exists(&self.paths.entry_file(key))? {
            log::info!("Purged cache entry for {}", key);
        }
        Ok(())
    }
}
