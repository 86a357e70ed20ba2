//! Bulk execution of a per-repository action over a selection.

mod executor;
mod gate;
mod pacer;

use std::fmt;

use crate::model::Repository;

pub use executor::{BulkExecutor, Confirmation};
pub use gate::{
    ConfirmPrompt, ConfirmStep, ConfirmationGate, ConfirmationSource, FINAL_KEYWORD,
    FIRST_KEYWORD, GateState,
};
pub use pacer::Pacer;

/// Successful result of one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Done,
    /// Nothing to do for this repository (e.g. already cloned).
    Skipped(String),
}

/// An action applied to one repository at a time.
///
/// Errors are recorded as per-item failures and never stop the run.
pub trait RepoAction: Sync {
    type Error: fmt::Display;

    fn apply(&self, repo: &Repository) -> Result<ActionOutcome, Self::Error>;
}

impl<F, E> RepoAction for F
where
    F: Fn(&Repository) -> Result<ActionOutcome, E> + Sync,
    E: fmt::Display,
{
    type Error = E;

    fn apply(&self, repo: &Repository) -> Result<ActionOutcome, E> {
        self(repo)
    }
}

/// Recorded result for one item of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Success,
    Skipped(String),
    Failure(String),
}

/// Per-item report handed to the caller as soon as the item finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    /// 1-based position in the selection.
    pub position: usize,
    pub full_name: String,
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    /// Every selected item was processed.
    #[default]
    Completed,
    /// The confirmation gate was not passed; nothing was touched.
    Aborted,
    /// Stopped early by an interrupt; finished items keep their outcomes.
    Interrupted,
}

/// Counts for one run. Independent of completion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub success_count: usize,
    pub failure_count: usize,
    pub skipped_count: usize,
    pub status: RunStatus,
}

impl Summary {
    fn aborted() -> Self {
        Self {
            status: RunStatus::Aborted,
            ..Self::default()
        }
    }

    fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Success => self.success_count += 1,
            ItemOutcome::Skipped(_) => self.skipped_count += 1,
            ItemOutcome::Failure(_) => self.failure_count += 1,
        }
    }

    /// Items that reached the action.
    pub fn processed(&self) -> usize {
        self.success_count + self.failure_count + self.skipped_count
    }
}
