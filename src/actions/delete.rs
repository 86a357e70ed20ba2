//! Delete each selected repository through the API.

use super::ActionError;
use crate::bulk::{ActionOutcome, RepoAction};
use crate::github::GitHubClient;
use crate::model::Repository;
use crate::types::Credentials;

/// Irreversible: run it behind the confirmation gate.
pub struct DeleteAction {
    client: GitHubClient,
    credentials: Credentials,
}

impl DeleteAction {
    pub fn new(client: GitHubClient, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
        }
    }
}

impl RepoAction for DeleteAction {
    type Error = ActionError;

    fn apply(&self, repo: &Repository) -> Result<ActionOutcome, ActionError> {
        if !repo.full_name.contains('/') {
            return Err(ActionError::InvalidTarget(format!(
                "refusing to delete malformed name '{}'",
                repo.full_name
            )));
        }
        self.client
            .delete_repository(&self.credentials, &repo.full_name)?;
        Ok(ActionOutcome::Done)
    }
}
