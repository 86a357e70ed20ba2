//! Cache directory path management
//!
//! ```text
//! ~/.cache/ghrm/
//! ├── octocat_all_repos.json
//! ├── octocat_public_repos.json
//! └── my-org_forks_repos.json
//! ```
//!
//! One file per (account, category) pair.

use std::path::{Path, PathBuf};

use super::CacheKey;

/// Suffix shared by every cache entry file.
const ENTRY_SUFFIX: &str = "_repos.json";

/// Whether `name` is a cache entry file or a temp file an interrupted write
/// left next to one (`{entry}.tmp.{pid}.{n}`).
pub(crate) fn is_cache_file(name: &str) -> bool {
    name.ends_with(ENTRY_SUFFIX) || name.contains(&format!("{}.tmp.", ENTRY_SUFFIX))
}

/// Manages filesystem paths for the cache directory layout
#[derive(Debug, Clone)]
pub struct CachePaths {
    root: PathBuf,
}

impl CachePaths {
    /// Creates a new CachePaths with the specified root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root cache directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the entry file for a key: `{root}/{account}_{category}_repos.json`
    pub fn entry_file(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!(
            "{}_{}{}",
            key.account.as_str(),
            key.category.as_str(),
            ENTRY_SUFFIX
        ))
    }
}

impl Default for CachePaths {
    /// Creates a CachePaths using the system cache directory + "ghrm"
    fn default() -> Self {
        let cache_dir = dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".cache"));
        Self::new(cache_dir.join("ghrm"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;

    fn key(account: &str, category: Category) -> CacheKey {
        CacheKey::new(account.parse().unwrap(), category)
    }

    #[test]
    fn test_default() {
        let paths = CachePaths::default();
        assert!(paths.root().ends_with("ghrm"));
    }

    #[test]
    fn test_entry_file() {
        let paths = CachePaths::new("cache-root");
        assert_eq!(
            paths.entry_file(&key("octocat", Category::All)),
            PathBuf::from("cache-root").join("octocat_all_repos.json")
        );
    }

    #[test]
    fn test_entry_file_per_category() {
        let paths = CachePaths::new("cache-root");
        let files: std::collections::HashSet<_> = Category::ALL
            .iter()
            .map(|c| paths.entry_file(&key("my-org", *c)))
            .collect();
        assert_eq!(files.len(), 4);
        assert!(files.contains(&PathBuf::from("cache-root").join("my-org_forks_repos.json")));
    }

    #[test]
    fn test_is_cache_file() {
        assert!(is_cache_file("octocat_all_repos.json"));
        assert!(is_cache_file("octocat_all_repos.json.tmp.4242.7"));
        assert!(!is_cache_file("unrelated.txt"));
        assert!(!is_cache_file("notes.json.tmp.1.2"));
    }
}
