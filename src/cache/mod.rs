//! TTL-gated snapshot cache keyed by (account, category)

mod file;
mod memory;
mod paths;
mod staleness;
mod swap;

use serde_json::Value;
use thiserror::Error;

use crate::types::{Account, Category};

pub use file::{CacheFileInfo, FileCache};
pub use memory::MemoryCache;
pub use paths::CachePaths;
pub use staleness::DEFAULT_TTL;

/// Errors returned by cache writes and purges.
#[derive(Error, Debug)]
pub enum CacheError {
    /// An underlying IO operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The snapshot could not be serialized.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Identifies one cached listing. Categories are cached independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub account: Account,
    pub category: Category,
}

impl CacheKey {
    pub fn new(account: Account, category: Category) -> Self {
        Self { account, category }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.account, self.category)
    }
}

/// Storage for raw listing snapshots.
///
/// `read` only returns entries younger than the store's TTL. `write` replaces
/// the whole snapshot for a key or leaves the previous one in place.
pub trait CacheStore {
    fn read(&self, key: &CacheKey) -> Option<Vec<Value>>;
    fn write(&self, key: &CacheKey, repos: &[Value]) -> Result<(), CacheError>;
    fn purge(&self, key: &CacheKey) -> Result<(), CacheError>;
}

impl<T: CacheStore + ?Sized> CacheStore for &T {
    fn read(&self, key: &CacheKey) -> Option<Vec<Value>> {
        (**self).read(key)
    }

    fn write(&self, key: &CacheKey, repos: &[Value]) -> Result<(), CacheError> {
        (**self).write(key, repos)
    }

    fn purge(&self, key: &CacheKey) -> Result<(), CacheError> {
        (**self).purge(key)
    }
}
