//! Sequential (or bounded-parallel) bulk runner.
//!
//! Items are started in selection order. Every item start goes through a
//! shared [`Pacer`], so the inter-item pause is preserved in aggregate even
//! with several workers. A failing item is recorded and the run continues;
//! nothing is retried.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded};

use super::gate::{ConfirmationGate, ConfirmationSource, GateState};
use super::pacer::Pacer;
use super::{ActionOutcome, ItemOutcome, ItemReport, RepoAction, RunStatus, Summary};
use crate::model::Repository;

/// Whether a run must pass the two-step confirmation gate.
pub enum Confirmation<'a> {
    NotRequired,
    Required(&'a mut dyn ConfirmationSource),
}

pub struct BulkExecutor {
    item_pause: Duration,
    workers: usize,
    interrupt: Option<Arc<AtomicBool>>,
}

impl BulkExecutor {
    /// Single-worker executor pausing `item_pause` between items.
    pub fn new(item_pause: Duration) -> Self {
        Self {
            item_pause,
            workers: 1,
            interrupt: None,
        }
    }

    /// Run up to `workers` actions at once (at least one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Stop starting new items once `flag` is set.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    fn interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Apply `action` to every repository in `selection`.
    ///
    /// `on_item` is called on the calling thread once per finished item.
    /// An empty selection returns immediately without prompting.
    pub fn execute<A, F>(
        &self,
        selection: &[&Repository],
        action: &A,
        confirmation: Confirmation<'_>,
        mut on_item: F,
    ) -> Summary
    where
        A: RepoAction + ?Sized,
        F: FnMut(&ItemReport),
    {
        if selection.is_empty() {
            return Summary::default();
        }

        let mut gate = ConfirmationGate::new(matches!(confirmation, Confirmation::Required(_)));
        let state = match confirmation {
            Confirmation::NotRequired => gate.open(),
            Confirmation::Required(source) => gate.resolve(source, selection.len()),
        };
        if state != GateState::Running {
            log::info!("Bulk run aborted at confirmation");
            return Summary::aborted();
        }

        log::info!(
            "Running bulk action over {} repositories with {} worker(s)",
            selection.len(),
            self.workers
        );

        let pacer = Pacer::new(self.item_pause);
        let mut summary = Summary::default();
        let mut report = |item: ItemReport| {
            summary.record(&item.outcome);
            on_item(&item);
        };

        if self.workers == 1 {
            self.run_sequential(selection, action, &pacer, &mut report);
        } else {
            self.run_parallel(selection, action, &pacer, &mut report);
        }
        gate.finish();

        if summary.processed() < selection.len() && self.interrupted() {
            log::warn!(
                "Bulk run interrupted after {} of {} items",
                summary.processed(),
                selection.len()
            );
            summary.status = RunStatus::Interrupted;
        }

        log::info!(
            "Bulk run finished: {} succeeded, {} failed, {} skipped",
            summary.success_count,
            summary.failure_count,
            summary.skipped_count
        );
        summary
    }

    fn run_sequential<A>(
        &self,
        selection: &[&Repository],
        action: &A,
        pacer: &Pacer,
        report: &mut dyn FnMut(ItemReport),
    ) where
        A: RepoAction + ?Sized,
    {
        for (index, repo) in selection.iter().enumerate() {
            if self.interrupted() {
                break;
            }
            pacer.wait();
            report(run_item(action, index, repo));
        }
    }

    fn run_parallel<A>(
        &self,
        selection: &[&Repository],
        action: &A,
        pacer: &Pacer,
        report: &mut dyn FnMut(ItemReport),
    ) where
        A: RepoAction + ?Sized,
    {
        let (job_tx, job_rx) = bounded::<(usize, &Repository)>(self.workers);
        let (done_tx, done_rx) = unbounded::<ItemReport>();

        std::thread::scope(|scope| {
            for _ in 0..self.workers {
                let job_rx = job_rx.clone();
                let done_tx = done_tx.clone();
                scope.spawn(move || {
                    for (index, repo) in job_rx {
                        if self.interrupted() {
                            break;
                        }
                        pacer.wait();
                        if done_tx.send(run_item(action, index, repo)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(job_rx);
            drop(done_tx);

            scope.spawn(move || {
                for (index, repo) in selection.iter().enumerate() {
                    if self.interrupted() || job_tx.send((index, *repo)).is_err() {
                        break;
                    }
                }
            });

            for item in done_rx {
                report(item);
            }
        });
    }
}

fn run_item<A>(action: &A, index: usize, repo: &Repository) -> ItemReport
where
    A: RepoAction + ?Sized,
{
    let outcome = match action.apply(repo) {
        Ok(ActionOutcome::Done) => {
            log::info!("{}: done", repo.full_name);
            ItemOutcome::Success
        }
        Ok(ActionOutcome::Skipped(reason)) => {
            log::info!("{}: skipped ({})", repo.full_name, reason);
            ItemOutcome::Skipped(reason)
        }
        Err(e) => {
            log::warn!("{}: failed: {}", repo.full_name, e);
            ItemOutcome::Failure(e.to_string())
        }
    };
    ItemReport {
        position: index + 1,
        full_name: repo.full_name.clone(),
        outcome,
    }
}
