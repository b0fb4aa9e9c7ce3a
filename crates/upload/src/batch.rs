//! Batch coordinator.
//!
//! Runs one transfer session at a time in submission order, aggregates
//! progress events, finalizes the optional group, and supports
//! cancellation.

use std::sync::Arc;

use fileshare_transfer::{Admission, ProgressGate, TransferUnit, admit_units};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::UploadError;
use crate::group::GroupFinalizer;
use crate::policy::TransferPolicy;
use crate::session::{PercentSink, TransferSession};
use crate::store::RemoteStore;
use crate::types::{BatchOutcome, BatchRequest, GroupOutcome, UnitFailure, UploadEvent};

const EVENT_CAPACITY: usize = 256;

/// Uploads a queue of files to one store.
pub struct BatchCoordinator {
    policy: TransferPolicy,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
    cancel: CancellationToken,
}

impl Default for BatchCoordinator {
    fn default() -> Self {
        Self::new(TransferPolicy::default())
    }
}

impl BatchCoordinator {
    pub fn new(policy: TransferPolicy) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);
        Self {
            policy,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// Token shared by every session this coordinator runs.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Uploads every unit in order, then creates the group if requested.
    ///
    /// A failed unit does not stop the batch; cancellation does, and the
    /// units never started are reported as cancelled.
    pub async fn run(&self, store: &dyn RemoteStore, request: BatchRequest) -> BatchOutcome {
        let BatchRequest {
            units,
            group,
            group_name,
            compress,
        } = request;

        let mut outcome = BatchOutcome::new(units.len());
        let Admission { admitted, rejected } = admit_units(units);
        for (unit, e) in rejected {
            let failure = UnitFailure::new(&unit, &UploadError::from(e));
            warn!(unit = unit.index, name = %unit.name, "rejected before upload");
            self.emit(UploadEvent::UnitFailed(failure.clone()));
            outcome.failures.push(failure);
        }

        let total = admitted.len();
        let batch_gate = Arc::new(ProgressGate::new());
        let mut queue = admitted.into_iter();
        let mut completed = 0usize;

        while let Some(unit) = queue.next() {
            if self.cancel.is_cancelled() {
                self.cancel_remaining(&mut outcome, std::iter::once(unit).chain(queue));
                break;
            }

            debug!(unit = unit.index, name = %unit.name, size = unit.size, "unit started");
            self.emit(UploadEvent::UnitStarted {
                index: unit.index,
                name: unit.name.clone(),
                size: unit.size,
                chunked: self
                    .policy
                    .thresholds
                    .plan(unit.size)
                    .is_ok_and(|plan| plan.is_chunked()),
            });

            let sink = self.progress_sink(unit.index, completed, total, Arc::clone(&batch_gate));
            let session = TransferSession::new(
                unit.clone(),
                store,
                &self.policy,
                self.cancel.clone(),
                compress,
                sink,
            );

            match session.run().await {
                Ok(result) => {
                    info!(unit = unit.index, name = %unit.name, code = %result.code, "upload succeeded");
                    self.emit(UploadEvent::UnitSucceeded(result.clone()));
                    outcome.results.push(result);
                }
                Err(UploadError::Cancelled) => {
                    info!(unit = unit.index, "upload cancelled");
                    self.cancel_remaining(&mut outcome, std::iter::once(unit).chain(queue));
                    break;
                }
                Err(e) => {
                    error!(unit = unit.index, name = %unit.name, error = %e, "upload failed");
                    let failure = UnitFailure::new(&unit, &e);
                    self.emit(UploadEvent::UnitFailed(failure.clone()));
                    outcome.failures.push(failure);
                }
            }

            completed += 1;
            if let Some(percent) = batch_gate.advance_ratio(completed as u64, total as u64) {
                self.emit(UploadEvent::BatchProgress {
                    percent,
                    completed,
                    total,
                });
            }
        }

        outcome.group = if !group {
            GroupOutcome::NotRequested
        } else if outcome.cancelled || outcome.results.len() < 2 {
            debug!(results = outcome.results.len(), "group skipped");
            GroupOutcome::Skipped
        } else {
            self.finalize_group(store, &outcome, group_name).await
        };
        if matches!(outcome.group, GroupOutcome::Skipped) && self.cancel.is_cancelled() {
            outcome.cancelled = true;
        }

        outcome.failures.sort_by_key(|f| f.index);
        if batch_gate.finish() {
            self.emit(UploadEvent::BatchProgress {
                percent: 100,
                completed,
                total,
            });
        }
        info!(
            succeeded = outcome.results.len(),
            failed = outcome.failures.len(),
            cancelled = outcome.cancelled,
            "batch finished"
        );
        self.emit(UploadEvent::BatchFinished {
            succeeded: outcome.results.len(),
            failed: outcome.failures.len(),
            cancelled: outcome.cancelled,
        });
        outcome
    }

    async fn finalize_group(
        &self,
        store: &dyn RemoteStore,
        outcome: &BatchOutcome,
        group_name: Option<String>,
    ) -> GroupOutcome {
        let finalizer = GroupFinalizer::new(store, &self.policy, &self.cancel);
        match finalizer.finalize(&outcome.results, group_name).await {
            Ok(group) => {
                info!(code = %group.code, members = group.member_count, "group created");
                self.emit(UploadEvent::GroupCreated(group.clone()));
                GroupOutcome::Created(group)
            }
            Err(UploadError::Cancelled) => GroupOutcome::Skipped,
            Err(e) => {
                error!(error = %e, "group creation failed");
                let message = e.user_message();
                self.emit(UploadEvent::GroupFailed {
                    message: message.clone(),
                });
                GroupOutcome::Failed(message)
            }
        }
    }

    fn cancel_remaining(
        &self,
        outcome: &mut BatchOutcome,
        units: impl Iterator<Item = TransferUnit>,
    ) {
        outcome.cancelled = true;
        for unit in units {
            let failure = UnitFailure::new(&unit, &UploadError::Cancelled);
            self.emit(UploadEvent::UnitFailed(failure.clone()));
            outcome.failures.push(failure);
        }
    }

    /// Forwards a unit's percentage and folds it into the batch percentage
    /// `(completed + fraction) / total`.
    fn progress_sink(
        &self,
        index: usize,
        completed: usize,
        total: usize,
        batch_gate: Arc<ProgressGate>,
    ) -> PercentSink {
        let events_tx = self.events_tx.clone();
        Arc::new(move |percent| {
            let _ = events_tx.try_send(UploadEvent::UnitProgress { index, percent });
            let done = completed as u64 * 100 + u64::from(percent);
            if let Some(overall) = batch_gate.advance_ratio(done, total as u64 * 100) {
                let _ = events_tx.try_send(UploadEvent::BatchProgress {
                    percent: overall,
                    completed,
                    total,
                });
            }
        })
    }

    /// Events are best-effort; the returned outcome is authoritative.
    fn emit(&self, event: UploadEvent) {
        if let Err(e) = self.events_tx.try_send(event) {
            debug!(error = %e, "upload event dropped");
        }
    }
}
