//! Clone each selected repository into a destination directory.

use std::io;
use std::path::{Path, PathBuf};

use super::ActionError;
use super::git::{GitCli, GitError, is_repository, validate_name};
use crate::bulk::{ActionOutcome, RepoAction};
use crate::model::Repository;

/// Clones into `{dest_root}/{name}`. An existing clone is skipped.
pub struct CloneAction {
    git: GitCli,
    dest_root: PathBuf,
}

impl CloneAction {
    pub fn new(dest_root: impl Into<PathBuf>) -> Self {
        Self {
            git: GitCli::new(),
            dest_root: dest_root.into(),
        }
    }

    pub fn dest_root(&self) -> &Path {
        &self.dest_root
    }
}

impl RepoAction for CloneAction {
    type Error = ActionError;

    fn apply(&self, repo: &Repository) -> Result<ActionOutcome, ActionError> {
        validate_name(&repo.name, "repository name")?;
        let dest = self.dest_root.join(&repo.name);

        // Claim the destination before cloning. Only the worker that created
        // it may clone into it or remove it again.
        std::fs::create_dir_all(&self.dest_root).map_err(GitError::from)?;
        match std::fs::create_dir(&dest) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return existing(&dest),
            Err(e) => return Err(GitError::from(e).into()),
        }

        if let Err(e) = self.git.clone_to(&repo.clone_url, &dest) {
            if let Err(cleanup) = std::fs::remove_dir_all(&dest) {
                log::warn!("Failed to remove {}: {}", dest.display(), cleanup);
            }
            return Err(e.into());
        }
        Ok(ActionOutcome::Done)
    }
}

fn existing(dest: &Path) -> Result<ActionOutcome, ActionError> {
    if is_repository(dest) {
        return Ok(ActionOutcome::Skipped(format!(
            "{} already exists",
            dest.display()
        )));
    }
    Err(GitError::InvalidInput(format!(
        "{} exists and is not a git repository",
        dest.display()
    ))
    .into())
}
