//! Repository entity and its permissive decoder.
//!
//! Raw API payloads are decoded field by field through [`RepositoryBuilder`].
//! A field that is missing, `null`, or of the wrong JSON type stays unset in
//! the builder and receives its default in [`RepositoryBuilder::build`], so a
//! malformed record never fails the surrounding fetch.

use serde_json::{Map, Value};

/// Whether a repository is visible to everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// Display kind, with forks taking precedence over visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoKind {
    Fork,
    Private,
    Public,
}

/// A repository as returned by one fetch. Never mutated after decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub name: String,
    /// `owner/name`, unique within an account's namespace.
    pub full_name: String,
    pub visibility: Visibility,
    pub is_fork: bool,
    pub html_url: String,
    pub clone_url: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub star_count: u64,
    pub fork_count: u64,
    pub size_kb: u64,
    pub created: String,
    pub updated: String,
    pub pushed: String,
    pub default_branch: String,
    pub topics: Vec<String>,
}

impl Repository {
    /// Decode a raw API payload, defaulting every unusable field.
    pub fn from_payload(payload: &Value) -> Self {
        RepositoryBuilder::from_payload(payload).build()
    }

    pub fn is_private(&self) -> bool {
        self.visibility == Visibility::Private
    }

    /// Public and not a fork.
    pub fn is_public_source(&self) -> bool {
        self.visibility == Visibility::Public && !self.is_fork
    }

    pub fn kind(&self) -> RepoKind {
        if self.is_fork {
            RepoKind::Fork
        } else if self.is_private() {
            RepoKind::Private
        } else {
            RepoKind::Public
        }
    }
}

/// Field-by-field accumulator for [`Repository`].
#[derive(Debug, Default)]
pub struct RepositoryBuilder {
    name: Option<String>,
    full_name: Option<String>,
    private: Option<bool>,
    fork: Option<bool>,
    html_url: Option<String>,
    clone_url: Option<String>,
    description: Option<String>,
    language: Option<String>,
    star_count: Option<u64>,
    fork_count: Option<u64>,
    size_kb: Option<u64>,
    created: Option<String>,
    updated: Option<String>,
    pushed: Option<String>,
    default_branch: Option<String>,
    topics: Option<Vec<String>>,
}

const DEFAULT_BRANCH: &str = "main";

impl RepositoryBuilder {
    /// Collect every usable field from a payload. Non-object payloads yield an
    /// empty builder.
    pub fn from_payload(payload: &Value) -> Self {
        let Some(obj) = payload.as_object() else {
            log::debug!("repository payload is not an object, using defaults");
            return Self::default();
        };

        Self {
            name: string(obj, "name"),
            full_name: string(obj, "full_name"),
            private: flag(obj, "private"),
            fork: flag(obj, "fork"),
            html_url: string(obj, "html_url"),
            clone_url: string(obj, "clone_url"),
            description: string(obj, "description"),
            language: string(obj, "language"),
            star_count: count(obj, "stargazers_count"),
            fork_count: count(obj, "forks_count"),
            size_kb: count(obj, "size"),
            created: string(obj, "created_at"),
            updated: string(obj, "updated_at"),
            pushed: string(obj, "pushed_at"),
            default_branch: string(obj, "default_branch"),
            topics: string_list(obj, "topics"),
        }
    }

    pub fn build(self) -> Repository {
        Repository {
            name: self.name.unwrap_or_default(),
            full_name: self.full_name.unwrap_or_default(),
            visibility: match self.private {
                Some(true) => Visibility::Private,
                Some(false) | None => Visibility::Public,
            },
            is_fork: self.fork.unwrap_or(false),
            html_url: self.html_url.unwrap_or_default(),
            clone_url: self.clone_url.unwrap_or_default(),
            description: self.description,
            language: self.language,
            star_count: self.star_count.unwrap_or(0),
            fork_count: self.fork_count.unwrap_or(0),
            size_kb: self.size_kb.unwrap_or(0),
            created: self.created.unwrap_or_default(),
            updated: self.updated.unwrap_or_default(),
            pushed: self.pushed.unwrap_or_default(),
            default_branch: self
                .default_branch
                .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            topics: self.topics.unwrap_or_default(),
        }
    }
}

fn string(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn flag(obj: &Map<String, Value>, key: &str) -> Option<bool> {
    obj.get(key).and_then(Value::as_bool)
}

fn count(obj: &Map<String, Value>, key: &str) -> Option<u64> {
    obj.get(key).and_then(Value::as_u64)
}

// Non-string entries are dropped rather than invalidating the whole list.
fn string_list(obj: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    obj.get(key).and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}
