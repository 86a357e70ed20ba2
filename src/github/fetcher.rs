//! Cache-aware paginated fetcher.
//!
//! Pages are requested from 1 upward until the first empty page; there is no
//! total-count check, so the API must end every listing with an empty page.
//! A failure on any page aborts the whole fetch and leaves the cache as it was.

use std::time::Duration;

use serde_json::Value;

use super::{PageRequest, PageSource, TransportError};
use crate::cache::{CacheKey, CacheStore};
use crate::model::Repository;
use crate::types::{Category, Credentials};

/// Items requested per page.
pub const PAGE_SIZE: u32 = 100;

/// Pause between consecutive page requests.
pub const PAGE_PAUSE: Duration = Duration::from_millis(100);

/// Drives a [`PageSource`] to exhaustion with read-through caching.
pub struct Fetcher<S, C> {
    source: S,
    cache: C,
    page_size: u32,
    page_pause: Duration,
}

impl<S: PageSource, C: CacheStore> Fetcher<S, C> {
    pub fn new(source: S, cache: C) -> Self {
        Self {
            source,
            cache,
            page_size: PAGE_SIZE,
            page_pause: PAGE_PAUSE,
        }
    }

    /// Set the pause between page requests.
    pub fn with_page_pause(mut self, pause: Duration) -> Self {
        self.page_pause = pause;
        self
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Return every repository of `category` for the credential's account.
    ///
    /// With `allow_cache`, a fresh cache entry is decoded and returned without
    /// any network call. Otherwise all pages are fetched, the raw
    /// concatenation is written to the cache, and the decoded list returned.
    pub fn fetch(
        &self,
        credentials: &Credentials,
        category: Category,
        allow_cache: bool,
    ) -> Result<Vec<Repository>, TransportError> {
        let key = CacheKey::new(credentials.account.clone(), category);

        if allow_cache {
            if let Some(cached) = self.cache.read(&key) {
                log::info!("Using {} cached repositories for {}", cached.len(), key);
                return Ok(decode(&cached, category));
            }
        }

        let raw = self.fetch_all_pages(credentials, category)?;

        if let Err(e) = self.cache.write(&key, &raw) {
            log::warn!("Failed to cache repositories for {}: {}", key, e);
        }

        let repos = decode(&raw, category);
        log::info!("Fetched {} repositories for {}", repos.len(), key);
        Ok(repos)
    }

    fn fetch_all_pages(
        &self,
        credentials: &Credentials,
        category: Category,
    ) -> Result<Vec<Value>, TransportError> {
        let mut raw = Vec::new();
        let mut page = 1;

        loop {
            if page > 1 && !self.page_pause.is_zero() {
                std::thread::sleep(self.page_pause);
            }

            let request = PageRequest {
                category,
                page,
                per_page: self.page_size,
            };
            log::debug!("Requesting {} page {}", category, page);

            let items = self.source.fetch_page(credentials, &request).map_err(|e| {
                log::warn!("Fetching {} page {} failed: {}", category, page, e);
                e
            })?;

            if items.is_empty() {
                return Ok(raw);
            }

            raw.extend(items);
            page += 1;
        }
    }
}

/// Decode raw payloads in order, narrowing the forks category.
fn decode(raw: &[Value], category: Category) -> Vec<Repository> {
    raw.iter()
        .map(Repository::from_payload)
        .filter(|repo| category != Category::Forks || repo.is_fork)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, CachePaths, FileCache, MemoryCache};
    use crate::model::fixtures::payload;
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::time::Instant;
    use tempfile::TempDir;

    /// Page source replaying a scripted sequence of responses.
    struct ScriptedSource {
        responses: RefCell<VecDeque<Result<Vec<Value>, TransportError>>>,
        requests: RefCell<Vec<PageRequest>>,
        sent_at: RefCell<Vec<Instant>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<Vec<Value>, TransportError>>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
                requests: RefCell::new(Vec::new()),
                sent_at: RefCell::new(Vec::new()),
            }
        }

        fn pages(pages: Vec<Vec<Value>>) -> Self {
            Self::new(pages.into_iter().map(Ok).collect())
        }

        fn request_count(&self) -> usize {
            self.requests.borrow().len()
        }
    }

    impl PageSource for ScriptedSource {
        fn fetch_page(
            &self,
            _credentials: &Credentials,
            request: &PageRequest,
        ) -> Result<Vec<Value>, TransportError> {
            self.requests.borrow_mut().push(*request);
            self.sent_at.borrow_mut().push(Instant::now());
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected request for page {}", request.page))
        }
    }

    /// Cache whose writes always fail.
    struct BrokenCache;

    impl CacheStore for BrokenCache {
        fn read(&self, _key: &CacheKey) -> Option<Vec<Value>> {
            None
        }

        fn write(&self, _key: &CacheKey, _repos: &[Value]) -> Result<(), CacheError> {
            Err(CacheError::Io(std::io::Error::other("disk full")))
        }

        fn purge(&self, _key: &CacheKey) -> Result<(), CacheError> {
            Ok(())
        }
    }

    fn credentials() -> Credentials {
        Credentials::new("octocat".parse().unwrap(), "token")
    }

    fn key(category: Category) -> CacheKey {
        CacheKey::new("octocat".parse().unwrap(), category)
    }

    fn named(names: &[&str]) -> Vec<Value> {
        names.iter().map(|n| payload(n, false, false)).collect()
    }

    fn fetcher<S: PageSource, C: CacheStore>(source: S, cache: C) -> Fetcher<S, C> {
        Fetcher::new(source, cache).with_page_pause(Duration::ZERO)
    }

    fn names(repos: &[Repository]) -> Vec<&str> {
        repos.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_concatenates_pages_until_empty() {
        let source = ScriptedSource::pages(vec![
            named(&["a", "b"]),
            named(&["c"]),
            named(&["d", "e"]),
            vec![],
        ]);
        let cache = MemoryCache::new();
        let fetcher = fetcher(&source, &cache);

        let repos = fetcher.fetch(&credentials(), Category::All, true).unwrap();

        assert_eq!(names(&repos), vec!["a", "b", "c", "d", "e"]);
        // Short pages do not end pagination; only the empty one does.
        assert_eq!(source.request_count(), 4);
        let pages: Vec<u32> = source.requests.borrow().iter().map(|r| r.page).collect();
        assert_eq!(pages, vec![1, 2, 3, 4]);
        assert!(source.requests.borrow().iter().all(|r| r.per_page == PAGE_SIZE));
    }

    #[test]
    fn test_empty_first_page() {
        let source = ScriptedSource::pages(vec![vec![]]);
        let cache = MemoryCache::new();
        let repos = fetcher(&source, &cache)
            .fetch(&credentials(), Category::All, true)
            .unwrap();
        assert!(repos.is_empty());
        assert_eq!(source.request_count(), 1);
        assert_eq!(cache.read(&key(Category::All)), Some(vec![]));
    }

    #[test]
    fn test_populates_cache_with_raw_payloads() {
        let pages = vec![named(&["a"]), vec![json!({"odd": true})], vec![]];
        let source = ScriptedSource::pages(pages);
        let cache = MemoryCache::new();
        fetcher(&source, &cache)
            .fetch(&credentials(), Category::Public, true)
            .unwrap();

        let cached = cache.read(&key(Category::Public)).unwrap();
        assert_eq!(cached, vec![payload("a", false, false), json!({"odd": true})]);
        assert!(cache.read(&key(Category::All)).is_none());
    }

    #[test]
    fn test_fresh_cache_skips_network() {
        let source = ScriptedSource::pages(vec![]);
        let cache = MemoryCache::new();
        cache.write(&key(Category::All), &named(&["x", "y"])).unwrap();

        let repos = fetcher(&source, &cache)
            .fetch(&credentials(), Category::All, true)
            .unwrap();

        assert_eq!(names(&repos), vec!["x", "y"]);
        assert_eq!(source.request_count(), 0);
    }

    #[test]
    fn test_cached_empty_listing_is_a_hit() {
        let source = ScriptedSource::pages(vec![]);
        let cache = MemoryCache::new();
        cache.write(&key(Category::All), &[]).unwrap();

        let repos = fetcher(&source, &cache)
            .fetch(&credentials(), Category::All, true)
            .unwrap();
        assert!(repos.is_empty());
        assert_eq!(source.request_count(), 0);
    }

    #[test]
    fn test_cache_of_other_category_is_not_used() {
        let source = ScriptedSource::pages(vec![named(&["net"]), vec![]]);
        let cache = MemoryCache::new();
        cache.write(&key(Category::Public), &named(&["cached"])).unwrap();

        let repos = fetcher(&source, &cache)
            .fetch(&credentials(), Category::All, true)
            .unwrap();
        assert_eq!(names(&repos), vec!["net"]);
    }

    #[test]
    fn test_bypass_cache_refetches_and_overwrites() {
        let source = ScriptedSource::pages(vec![named(&["new"]), vec![]]);
        let cache = MemoryCache::new();
        cache.write(&key(Category::All), &named(&["old"])).unwrap();

        let repos = fetcher(&source, &cache)
            .fetch(&credentials(), Category::All, false)
            .unwrap();

        assert_eq!(names(&repos), vec!["new"]);
        assert_eq!(cache.read(&key(Category::All)), Some(named(&["new"])));
    }

    #[test]
    fn test_failure_mid_fetch_keeps_previous_cache_entry() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(CachePaths::new(dir.path()));
        cache.write(&key(Category::All), &named(&["old"])).unwrap();
        let before = std::fs::read(cache.paths().entry_file(&key(Category::All))).unwrap();

        let source = ScriptedSource::new(vec![
            Ok(named(&["a"])),
            Err(TransportError::Transport("connection reset".into())),
            Ok(named(&["c"])),
            Ok(vec![]),
        ]);

        let err = fetcher(&source, &cache)
            .fetch(&credentials(), Category::All, false)
            .unwrap_err();

        assert!(matches!(err, TransportError::Transport(_)));
        assert_eq!(source.request_count(), 2);
        let after = std::fs::read(cache.paths().entry_file(&key(Category::All))).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_failure_without_previous_entry_writes_nothing() {
        let cache = MemoryCache::new();
        let source = ScriptedSource::new(vec![Err(TransportError::Status {
            status: 401,
            message: "Bad credentials".into(),
        })]);

        let err = fetcher(&source, &cache)
            .fetch(&credentials(), Category::Private, true)
            .unwrap_err();
        assert!(err.is_auth());
        assert!(!cache.contains(&key(Category::Private)));
    }

    #[test]
    fn test_malformed_records_do_not_abort() {
        let source = ScriptedSource::pages(vec![
            vec![payload("good", false, false), json!(42), json!({"name": 5})],
            vec![],
        ]);
        let cache = MemoryCache::new();
        let repos = fetcher(&source, &cache)
            .fetch(&credentials(), Category::All, true)
            .unwrap();

        assert_eq!(repos.len(), 3);
        assert_eq!(repos[0].name, "good");
        assert_eq!(repos[1].name, "");
        assert_eq!(repos[2].default_branch, "main");
    }

    #[test]
    fn test_forks_category_keeps_only_forks() {
        let source = ScriptedSource::pages(vec![
            vec![
                payload("mine", false, false),
                payload("forked", false, true),
                payload("private-fork", true, true),
            ],
            vec![],
        ]);
        let cache = MemoryCache::new();
        let fetcher = fetcher(&source, &cache);

        let repos = fetcher.fetch(&credentials(), Category::Forks, true).unwrap();
        assert_eq!(names(&repos), vec!["forked", "private-fork"]);
        assert_eq!(source.requests.borrow()[0].category.api_type(), "all");

        // Cache path narrows the same way.
        let again = fetcher.fetch(&credentials(), Category::Forks, true).unwrap();
        assert_eq!(again, repos);
        assert_eq!(source.request_count(), 2);
    }

    #[test]
    fn test_cache_write_failure_still_returns_repositories() {
        let source = ScriptedSource::pages(vec![named(&["a"]), vec![]]);
        let repos = fetcher(&source, BrokenCache)
            .fetch(&credentials(), Category::All, true)
            .unwrap();
        assert_eq!(names(&repos), vec!["a"]);
    }

    #[test]
    fn test_pause_between_pages_only() {
        let pause = Duration::from_millis(20);
        let source = ScriptedSource::pages(vec![named(&["a"]), named(&["b"]), vec![]]);
        let cache = MemoryCache::new();
        let fetcher = Fetcher::new(&source, &cache).with_page_pause(pause);
        assert_eq!(Fetcher::new(&source, &cache).page_pause, PAGE_PAUSE);

        let start = Instant::now();
        fetcher.fetch(&credentials(), Category::All, false).unwrap();

        let sent_at = source.sent_at.borrow();
        assert_eq!(sent_at.len(), 3);
        assert!(sent_at[0] - start < pause, "first page must not wait");
        for gap in sent_at.windows(2) {
            assert!(gap[1] - gap[0] >= pause);
        }
    }

    #[test]
    fn test_cache_hit_does_not_pause() {
        let source = ScriptedSource::pages(vec![]);
        let cache = MemoryCache::new();
        cache.write(&key(Category::All), &named(&["x"])).unwrap();

        let start = Instant::now();
        Fetcher::new(&source, &cache)
            .with_page_pause(Duration::from_secs(5))
            .fetch(&credentials(), Category::All, true)
            .unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
