//! Git access for the clone action.
//!
//! Cloning goes through the git CLI so the user's credential helpers and SSH
//! setup apply. The existence check on a destination uses libgit2.

use git2::Repository;
use std::path::Path;
use std::process::{Command, Stdio};
use thiserror::Error;

/// Errors returned by git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Clone failed.
    #[error("clone failed: {0}")]
    CloneError(String),
    /// Underlying IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid inputs were provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Validate that a repository name is safe to use as a directory name.
///
/// Rejects:
/// - Empty strings
/// - `.` and `..` and anything containing `..`
/// - Strings containing `/` or `\` (path separators)
/// - Strings starting with `-` (could be interpreted as flags)
/// - Strings containing null bytes or control characters
pub fn validate_name(value: &str, name: &str) -> Result<(), GitError> {
    if value.is_empty() {
        return Err(GitError::InvalidInput(format!("{} cannot be empty", name)));
    }
    if value == "." || value.contains("..") {
        return Err(GitError::InvalidInput(format!(
            "{} cannot be '.' or contain '..'",
            name
        )));
    }
    if value.contains('/') || value.contains('\\') {
        return Err(GitError::InvalidInput(format!(
            "{} cannot contain path separators",
            name
        )));
    }
    if value.starts_with('-') {
        return Err(GitError::InvalidInput(format!(
            "{} cannot start with '-'",
            name
        )));
    }
    if value.bytes().any(|b| b < 0x20) {
        return Err(GitError::InvalidInput(format!(
            "{} cannot contain null or control characters",
            name
        )));
    }
    Ok(())
}

fn validate_url(url: &str) -> Result<(), GitError> {
    if url.is_empty() {
        return Err(GitError::InvalidInput("clone url cannot be empty".into()));
    }
    if url.starts_with('-') {
        return Err(GitError::InvalidInput("clone url cannot start with '-'".into()));
    }
    if url.bytes().any(|b| b < 0x20) {
        return Err(GitError::InvalidInput(
            "clone url cannot contain control characters".into(),
        ));
    }
    Ok(())
}

/// Whether `path` opens as a git repository.
pub fn is_repository(path: &Path) -> bool {
    Repository::open(path).is_ok()
}

/// Git CLI wrapper with security hardening.
pub struct GitCli {
    git_path: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCli {
    /// Create a new GitCli instance using the system git.
    pub fn new() -> Self {
        Self {
            git_path: "git".into(),
        }
    }

    /// Create a hardened Command with security settings.
    ///
    /// Applies:
    /// - `GIT_TERMINAL_PROMPT=0` - disable interactive prompts
    /// - `core.hooksPath=` - disable hooks execution
    /// - stdin closed
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.git_path);
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.args(["-c", "core.hooksPath="]);
        cmd.stdin(Stdio::null());
        cmd
    }

    /// `git --version`, or None when git cannot be run.
    pub fn version(&self) -> Option<String> {
        let output = self.command().arg("--version").output().ok()?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Clone `url` into `dest`, which may be absent or an empty directory. A
    /// destination created by a failed clone is removed again; concurrent
    /// callers must claim `dest` first.
    pub fn clone_to(&self, url: &str, dest: &Path) -> Result<(), GitError> {
        validate_url(url)?;

        let dest_existed = dest.exists();

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let output = self
            .command()
            .arg("clone")
            .arg("--")
            .arg(url)
            .arg(dest)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !dest_existed {
                let _ = std::fs::remove_dir_all(dest);
            }
            return Err(GitError::CloneError(stderr.trim().to_string()));
        }

        Ok(())
    }
}
