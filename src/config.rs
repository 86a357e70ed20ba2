//! User configuration, read from a JSON file.
//!
//! Lives at `<config_dir>/ghrm/config.json` unless `GHRM_CONFIG` points
//! elsewhere:
//!
//! ```json
//! { "username": "octocat", "token": "ghp_...", "cache_ttl_secs": 600 }
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::cache::{CachePaths, DEFAULT_TTL};
use crate::github::DEFAULT_API_URL;
use crate::types::{Account, Credentials, ParseError};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "GHRM_CONFIG";

const DEFAULT_CLONE_DIR: &str = "github_repos";

/// Errors loading the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid username '{username}': {source}")]
    InvalidAccount {
        username: String,
        source: ParseError,
    },
    #[error("no config directory on this platform; set GHRM_CONFIG")]
    NoConfigDir,
}

#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub username: String,
    token: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    cache_dir: Option<PathBuf>,
    #[serde(default = "default_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_clone_dir")]
    pub clone_dir: PathBuf,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL.as_secs()
}

fn default_clone_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CLONE_DIR)
}

impl Config {
    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_path(&default_path()?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        let config = Self::from_json(&text)?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(text)?;
        // Surface a bad username at load time rather than on first request.
        config.account()?;
        Ok(config)
    }

    pub fn account(&self) -> Result<Account, ConfigError> {
        self.username
            .parse()
            .map_err(|source| ConfigError::InvalidAccount {
                username: self.username.clone(),
                source,
            })
    }

    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        Ok(Credentials::new(self.account()?, self.token.clone()))
    }

    pub fn cache_paths(&self) -> CachePaths {
        match &self.cache_dir {
            Some(dir) => CachePaths::new(dir.clone()),
            None => CachePaths::default(),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("cache_dir", &self.cache_dir)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("clone_dir", &self.clone_dir)
            .finish()
    }
}

/// Config file location: `$GHRM_CONFIG`, else `<config_dir>/ghrm/config.json`.
pub fn default_path() -> Result<PathBuf, ConfigError> {
    resolve_path(std::env::var_os(CONFIG_ENV), dirs::config_dir())
}

fn resolve_path(
    override_path: Option<OsString>,
    config_dir: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    match override_path {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => config_dir
            .map(|dir| dir.join("ghrm").join("config.json"))
            .ok_or(ConfigError::NoConfigDir),
    }
}
