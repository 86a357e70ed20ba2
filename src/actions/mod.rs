//! Concrete per-repository actions for the bulk executor.

mod clone;
mod delete;
mod git;

use std::time::Duration;

use thiserror::Error;

use crate::github::TransportError;

pub use clone::CloneAction;
pub use delete::DeleteAction;
pub use git::{GitCli, GitError};

/// Pause between clones.
pub const CLONE_PAUSE: Duration = Duration::from_millis(500);

/// Pause between deletions, to stay clear of abuse limits.
pub const DELETE_PAUSE: Duration = Duration::from_secs(1);

/// Why a single action failed.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error(transparent)]
    Api(#[from] TransportError),
    #[error(transparent)]
    Git(#[from] GitError),
    #[error("invalid target: {0}")]
    InvalidTarget(String),
}
