//! Blocking GitHub REST client.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::{PageRequest, PageSource, TransportError};
use crate::types::Credentials;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Core API quota for the authenticated credential.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    /// Unix time at which the quota resets.
    pub reset: u64,
}

#[derive(Deserialize)]
struct RateLimitResponse {
    resources: RateLimitResources,
}

#[derive(Deserialize)]
struct RateLimitResources {
    core: RateLimit,
}

/// GitHub API client. Credentials are supplied per call.
#[derive(Clone)]
pub struct GitHubClient {
    agent: ureq::Agent,
    base_url: String,
}

impl Default for GitHubClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl GitHubClient {
    /// Create a client for the API rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: &str, path: &str, credentials: &Credentials) -> ureq::Request {
        self.agent
            .request(method, &format!("{}{}", self.base_url, path))
            .set("Authorization", &format!("Bearer {}", credentials.token()))
            .set("Accept", "application/vnd.github+json")
            .set("X-GitHub-Api-Version", "2022-11-28")
            .set("User-Agent", "ghrm")
    }

    /// Delete a repository by `owner/name`. Only `204 No Content` counts as
    /// success.
    pub fn delete_repository(
        &self,
        credentials: &Credentials,
        full_name: &str,
    ) -> Result<(), TransportError> {
        let response = self
            .request("DELETE", &format!("/repos/{}", full_name), credentials)
            .call()
            .map_err(map_error)?;

        match response.status() {
            204 => Ok(()),
            status => Err(TransportError::Status {
                status,
                message: format!("expected 204 No Content, got {}", response.status_text()),
            }),
        }
    }

    /// Fetch the core rate limit. Doubles as a credential check.
    pub fn rate_limit(&self, credentials: &Credentials) -> Result<RateLimit, TransportError> {
        let response = self
            .request("GET", "/rate_limit", credentials)
            .call()
            .map_err(map_error)?;
        let body = read_body(response)?;
        let parsed: RateLimitResponse =
            serde_json::from_str(&body).map_err(|e| TransportError::Body(e.to_string()))?;
        Ok(parsed.resources.core)
    }
}

impl PageSource for GitHubClient {
    fn fetch_page(
        &self,
        credentials: &Credentials,
        request: &PageRequest,
    ) -> Result<Vec<Value>, TransportError> {
        let mut call = self.request("GET", "/user/repos", credentials);
        for (name, value) in request.query_pairs() {
            call = call.query(name, &value);
        }

        let response = call.call().map_err(map_error)?;
        let body = read_body(response)?;
        match serde_json::from_str(&body) {
            Ok(Value::Array(items)) => Ok(items),
            Ok(other) => Err(TransportError::Body(format!(
                "expected a JSON array, got {}",
                json_kind(&other)
            ))),
            Err(e) => Err(TransportError::Body(e.to_string())),
        }
    }
}

fn read_body(response: ureq::Response) -> Result<String, TransportError> {
    response
        .into_string()
        .map_err(|e| TransportError::Transport(e.to_string()))
}

fn map_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            TransportError::Status {
                status,
                message: api_message(&body),
            }
        }
        ureq::Error::Transport(e) => TransportError::Transport(e.to_string()),
    }
}

/// GitHub error bodies look like `{"message": "..."}`; fall back to the raw body.
fn api_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
