//! GitHub REST access: the paging client and the cache-aware fetcher.

mod client;
mod fetcher;

use serde_json::Value;
use thiserror::Error;

use crate::types::{Category, Credentials};

pub use client::{DEFAULT_API_URL, GitHubClient, RateLimit};
pub use fetcher::{Fetcher, PAGE_PAUSE, PAGE_SIZE};

/// Network, HTTP or auth failure talking to the API.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The server answered with an unexpected status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),
    /// The response body was not what the endpoint promises.
    #[error("invalid response body: {0}")]
    Body(String),
}

impl TransportError {
    /// Whether the server rejected the credential.
    pub fn is_auth(&self) -> bool {
        matches!(self, TransportError::Status { status: 401 | 403, .. })
    }
}

/// One page of a repository listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub category: Category,
    /// 1-based page index.
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    /// Query parameters, most recently updated first.
    pub fn query_pairs(&self) -> [(&'static str, String); 5] {
        [
            ("type", self.category.api_type().to_string()),
            ("per_page", self.per_page.to_string()),
            ("page", self.page.to_string()),
            ("sort", "updated".to_string()),
            ("direction", "desc".to_string()),
        ]
    }
}

/// Something that can return one page of raw repository payloads.
pub trait PageSource {
    fn fetch_page(
        &self,
        credentials: &Credentials,
        request: &PageRequest,
    ) -> Result<Vec<Value>, TransportError>;
}

impl<T: PageSource + ?Sized> PageSource for &T {
    fn fetch_page(
        &self,
        credentials: &Credentials,
        request: &PageRequest,
    ) -> Result<Vec<Value>, TransportError> {
        (**self).fetch_page(credentials, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_pairs_for_forks_request_all() {
        let request = PageRequest {
            category: Category::Forks,
            page: 3,
            per_page: 100,
        };
        let pairs = request.query_pairs();
        assert_eq!(pairs[0], ("type", "all".to_string()));
        assert_eq!(pairs[1], ("per_page", "100".to_string()));
        assert_eq!(pairs[2], ("page", "3".to_string()));
        assert_eq!(pairs[3], ("sort", "updated".to_string()));
        assert_eq!(pairs[4], ("direction", "desc".to_string()));
    }

    #[test]
    fn auth_errors() {
        let unauthorized = TransportError::Status {
            status: 401,
            message: "Bad credentials".into(),
        };
        assert!(unauthorized.is_auth());
        assert!(!TransportError::Transport("timeout".into()).is_auth());
    }
}
