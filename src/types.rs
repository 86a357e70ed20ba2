//! Shared types for ghrm

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for parsing failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("value cannot be empty")]
    Empty,
    #[error("invalid character in value: {0}")]
    InvalidCharacter(char),
    #[error("value cannot start with '{0}'")]
    InvalidStart(char),
    #[error("value cannot end with '{0}'")]
    InvalidEnd(char),
    #[error("unknown category '{0}' (expected all, public, private or forks)")]
    UnknownCategory(String),
}

/// A GitHub account login (user or organization)
///
/// Validation rules:
/// - Non-empty
/// - Alphanumeric characters and hyphens only
/// - Cannot start or end with a hyphen
///
/// The login is also used in cache file names, so these rules keep it path-safe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Account(String);

impl Account {
    /// Returns the login as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Account {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseError::Empty);
        }

        if s.starts_with('-') {
            return Err(ParseError::InvalidStart('-'));
        }

        if s.ends_with('-') {
            return Err(ParseError::InvalidEnd('-'));
        }

        for c in s.chars() {
            if !c.is_ascii_alphanumeric() && c != '-' {
                return Err(ParseError::InvalidCharacter(c));
            }
        }

        Ok(Account(s.to_string()))
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-side filter dimension for a repository listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Category {
    #[default]
    All,
    Public,
    Private,
    Forks,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::All,
        Category::Public,
        Category::Private,
        Category::Forks,
    ];

    /// Label used in cache keys and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::All => "all",
            Category::Public => "public",
            Category::Private => "private",
            Category::Forks => "forks",
        }
    }

    /// Value sent as the `type` query parameter.
    ///
    /// The listing endpoint has no fork filter, so forks are requested as
    /// `all` and narrowed after decoding.
    pub fn api_type(&self) -> &'static str {
        match self {
            Category::Forks => "all",
            other => other.as_str(),
        }
    }
}

impl FromStr for Category {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Err(ParseError::Empty),
            "all" => Ok(Category::All),
            "public" => Ok(Category::Public),
            "private" => Ok(Category::Private),
            "forks" => Ok(Category::Forks),
            other => Err(ParseError::UnknownCategory(other.to_string())),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loaded credential pair. Acquiring and storing it is the caller's job.
#[derive(Clone)]
pub struct Credentials {
    pub account: Account,
    token: String,
}

impl Credentials {
    pub fn new(account: Account, token: impl Into<String>) -> Self {
        Self {
            account,
            token: token.into(),
        }
    }

    /// Returns the bearer token
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("token", &"<redacted>")
            .finish()
    }
}
