//! Sync reconciler
//!
//! One reconciliation pass:
//! 1. Read every unsynced (`pending` or `error`) record from the store
//! 2. Submit them to the acceptance endpoint in a single batch
//! 3. Mark accepted ids `synced`; leave unacknowledged records untouched
//! 4. On a failed or timed-out submission, mark the whole batch `error`
//!
//! Passes never overlap. A trigger that arrives while a pass is running is
//! coalesced into a single follow-up pass run by the active caller.
//! The reconciler never returns an error; callers observe the outcome by
//! re-reading the store (or through the returned [`ReconcileReport`]).

use crate::error::SyncError;
use crate::record::{MedicalRecord, SyncStatus};
use crate::store::{RecordStore, SyncedMark};
use crate::transport::SyncTransport;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Reconciler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Upper bound on one batch submission (in seconds, for serialization)
    #[serde(rename = "submit_timeout_secs", with = "duration_secs")]
    pub submit_timeout: Duration,
}

// Serialize Duration as seconds
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            submit_timeout: Duration::from_secs(30),
        }
    }
}

/// How a reconciliation call ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PassOutcome {
    /// No unsynced records; no request was made
    #[default]
    NothingToSync,
    /// The endpoint answered; accepted records were marked `synced`
    Completed,
    /// Submission failed or timed out; the batch was marked `error`
    TransportFailed,
    /// The store could not be read
    StorageFailed,
    /// Another pass was already running and will run once more on our behalf
    Coalesced,
}

/// Summary of the last pass run by a [`SyncReconciler::reconcile`] call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub outcome: PassOutcome,
    /// Passes executed by this call (follow-ups included)
    pub passes: u32,
    pub submitted: usize,
    pub accepted: usize,
    /// Submitted but absent from the accepted list; status left as-is
    pub unacknowledged: usize,
    pub marked_error: usize,
    /// Accepted, but edited locally while the batch was in flight
    pub modified_in_flight: usize,
    /// Accepted ids that were not part of the submitted batch
    pub unknown_ids: usize,
    /// Status writes that failed against the store
    pub storage_errors: usize,
}

impl ReconcileReport {
    fn with_outcome(outcome: PassOutcome) -> Self {
        Self {
            outcome,
            ..Self::default()
        }
    }
}

/// Reconciles locally unsynced records with the acceptance endpoint
pub struct SyncReconciler<S: ?Sized, T: ?Sized> {
    store: Arc<S>,
    transport: Arc<T>,
    config: ReconcilerConfig,
    in_flight: Mutex<()>,
    rerun_requested: AtomicBool,
}

impl<S, T> SyncReconciler<S, T>
where
    S: RecordStore + ?Sized,
    T: SyncTransport + ?Sized,
{
    pub fn new(store: Arc<S>, transport: Arc<T>, config: ReconcilerConfig) -> Self {
        Self {
            store,
            transport,
            config,
            in_flight: Mutex::new(()),
            rerun_requested: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Whether a pass is currently running
    pub fn is_running(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Run a reconciliation pass, or coalesce into the one already running.
    ///
    /// Safe to call fire-and-forget: nothing propagates to the caller.
    pub async fn reconcile(&self) -> ReconcileReport {
        self.rerun_requested.store(true, Ordering::SeqCst);

        let mut last: Option<ReconcileReport> = None;
        let mut passes = 0u32;

        loop {
            let Ok(guard) = self.in_flight.try_lock() else {
                break;
            };

            while self.rerun_requested.swap(false, Ordering::SeqCst) {
                passes += 1;
                if passes > 1 {
                    tracing::debug!(pass = passes, "Running coalesced follow-up pass");
                }
                last = Some(self.run_pass().await);
            }

            drop(guard);

            // A trigger may have landed between the last swap and the unlock.
            if !self.rerun_requested.load(Ordering::SeqCst) {
                break;
            }
        }

        match last {
            Some(mut report) => {
                report.passes = passes;
                report
            }
            None => {
                tracing::debug!("Reconciliation already in progress; trigger coalesced");
                ReconcileReport::with_outcome(PassOutcome::Coalesced)
            }
        }
    }

    async fn run_pass(&self) -> ReconcileReport {
        let batch = match self.store.list_unsynced().await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!(error = %e, "Could not read unsynced records");
                return ReconcileReport::with_outcome(PassOutcome::StorageFailed);
            }
        };

        if batch.is_empty() {
            tracing::debug!("No unsynced records");
            return ReconcileReport::with_outcome(PassOutcome::NothingToSync);
        }

        tracing::info!(batch_size = batch.len(), "Submitting unsynced records");

        let timeout = self.config.submit_timeout;
        let result = match tokio::time::timeout(timeout, self.transport.submit(&batch)).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout(timeout)),
        };

        let report = match result {
            Ok(accepted) => self.apply_acceptance(&batch, accepted).await,
            Err(e) => self.mark_batch_failed(&batch, &e).await,
        };

        tracing::info!(
            outcome = ?report.outcome,
            submitted = report.submitted,
            accepted = report.accepted,
            unacknowledged = report.unacknowledged,
            marked_error = report.marked_error,
            "Reconciliation pass finished"
        );

        report
    }

    async fn apply_acceptance(
        &self,
        batch: &[MedicalRecord],
        accepted: Vec<String>,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::with_outcome(PassOutcome::Completed);
        report.submitted = batch.len();

        let submitted: HashMap<&str, &MedicalRecord> =
            batch.iter().map(|record| (record.id.as_str(), record)).collect();
        let mut seen: HashSet<String> = HashSet::new();

        for id in accepted {
            if !seen.insert(id.clone()) {
                continue;
            }

            let Some(sent) = submitted.get(id.as_str()) else {
                tracing::warn!(record_id = %id, "Endpoint accepted an id that was not submitted");
                report.unknown_ids += 1;
                continue;
            };

            match self.store.mark_synced_if_unchanged(sent).await {
                Ok(SyncedMark::Marked) => report.accepted += 1,
                Ok(SyncedMark::Modified) => {
                    tracing::debug!(record_id = %id, "Record changed during sync; left for next pass");
                    report.modified_in_flight += 1;
                }
                Ok(SyncedMark::Missing) => {
                    tracing::warn!(record_id = %id, "Accepted record no longer in store");
                }
                Err(e) => {
                    tracing::error!(record_id = %id, error = %e, "Could not mark record synced");
                    report.storage_errors += 1;
                }
            }
        }

        report.unacknowledged = batch
            .iter()
            .filter(|record| !seen.contains(&record.id))
            .count();

        report
    }

    async fn mark_batch_failed(&self, batch: &[MedicalRecord], error: &SyncError) -> ReconcileReport {
        tracing::warn!(
            error = %error,
            batch_size = batch.len(),
            "Sync submission failed; marking batch as error"
        );

        let mut report = ReconcileReport::with_outcome(PassOutcome::TransportFailed);
        report.submitted = batch.len();

        for record in batch {
            match self.store.set_sync_status(&record.id, SyncStatus::Error).await {
                Ok(()) => report.marked_error += 1,
                Err(e) => {
                    tracing::error!(record_id = %record.id, error = %e, "Could not mark record as error");
                    report.storage_errors += 1;
                }
            }
        }

        report
    }
}
