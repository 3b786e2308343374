use async_trait::async_trait;
use record_sync::{
    MedicalRecord, MemoryRecordStore, PassOutcome, ReconcilerConfig, RecordStore, SqliteRecordStore,
    StoreConfig, SyncError, SyncReconciler, SyncResult, SyncStatus, SyncTransport, SyncedMark,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;

/// Transport whose answers are decided per test
struct ScriptedTransport {
    behavior: Behavior,
    calls: AtomicUsize,
    batches: Mutex<Vec<Vec<String>>>,
}

enum Behavior {
    AcceptAll,
    AcceptOnly(HashSet<String>),
    Fail,
    Hang,
}

impl ScriptedTransport {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            batches: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncTransport for ScriptedTransport {
    async fn submit(&self, batch: &[MedicalRecord]) -> SyncResult<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let ids: Vec<String> = batch.iter().map(|r| r.id.clone()).collect();
        self.batches.lock().unwrap().push(ids.clone());

        match &self.behavior {
            Behavior::AcceptAll => Ok(ids),
            Behavior::AcceptOnly(allowed) => {
                Ok(ids.into_iter().filter(|id| allowed.contains(id)).collect())
            }
            Behavior::Fail => Err(SyncError::SyncNetworkFailure("503 Service Unavailable".to_string())),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(ids)
            }
        }
    }
}

fn record(id: &str) -> MedicalRecord {
    MedicalRecord::new_pending(id, "Jane", "Flu", "Rest", "2024-01-01", "drA")
}

fn statuses(records: &[MedicalRecord]) -> Vec<(String, SyncStatus)> {
    records.iter().map(|r| (r.id.clone(), r.sync_status)).collect()
}

#[tokio::test]
async fn test_convergence_when_everything_is_accepted() {
    let store = Arc::new(MemoryRecordStore::with_records(
        (0..25).map(|i| record(&format!("rec-{i}"))),
    ));
    let transport = ScriptedTransport::new(Behavior::AcceptAll);
    let reconciler = SyncReconciler::new(store.clone(), transport.clone(), ReconcilerConfig::default());

    let report = reconciler.reconcile().await;

    assert_eq!(report.outcome, PassOutcome::Completed);
    assert_eq!(report.submitted, 25);
    assert_eq!(report.accepted, 25);
    assert_eq!(transport.calls(), 1);
    assert!(store.list_unsynced().await.unwrap().is_empty());
    assert!(store
        .list_all()
        .await
        .unwrap()
        .iter()
        .all(|r| r.sync_status == SyncStatus::Synced));
}

#[tokio::test]
async fn test_partial_acceptance_leaves_rejected_status_unchanged() {
    let store = Arc::new(MemoryRecordStore::with_records([
        record("A"),
        record("B").with_status(SyncStatus::Error),
        record("C"),
    ]));
    let allowed: HashSet<String> = ["A", "C"].iter().map(|s| s.to_string()).collect();
    let transport = ScriptedTransport::new(Behavior::AcceptOnly(allowed));
    let reconciler = SyncReconciler::new(store.clone(), transport, ReconcilerConfig::default());

    let report = reconciler.reconcile().await;

    assert_eq!(report.accepted, 2);
    assert_eq!(report.unacknowledged, 1);
    assert_eq!(
        statuses(&store.list_all().await.unwrap()),
        vec![
            ("A".to_string(), SyncStatus::Synced),
            ("B".to_string(), SyncStatus::Error),
            ("C".to_string(), SyncStatus::Synced),
        ]
    );
}

#[tokio::test]
async fn test_failed_submission_marks_whole_batch_error() {
    let store = Arc::new(MemoryRecordStore::with_records([
        record("A"),
        record("B"),
        record("S").with_status(SyncStatus::Synced),
    ]));
    let transport = ScriptedTransport::new(Behavior::Fail);
    let reconciler = SyncReconciler::new(store.clone(), transport, ReconcilerConfig::default());

    let report = reconciler.reconcile().await;

    assert_eq!(report.outcome, PassOutcome::TransportFailed);
    assert_eq!(
        statuses(&store.list_all().await.unwrap()),
        vec![
            ("A".to_string(), SyncStatus::Error),
            ("B".to_string(), SyncStatus::Error),
            ("S".to_string(), SyncStatus::Synced),
        ]
    );
}

#[tokio::test]
async fn test_timeout_is_treated_as_failure() {
    let store = Arc::new(MemoryRecordStore::with_records([record("A")]));
    let transport = ScriptedTransport::new(Behavior::Hang);
    let config = ReconcilerConfig {
        submit_timeout: Duration::from_millis(50),
    };
    let reconciler = SyncReconciler::new(store.clone(), transport, config);

    let report = reconciler.reconcile().await;

    assert_eq!(report.outcome, PassOutcome::TransportFailed);
    assert_eq!(
        store.get_by_id("A").await.unwrap().unwrap().sync_status,
        SyncStatus::Error
    );
}

#[tokio::test]
async fn test_second_run_with_nothing_unsynced_changes_nothing() {
    let store = Arc::new(MemoryRecordStore::with_records([record("A"), record("B")]));
    let transport = ScriptedTransport::new(Behavior::AcceptAll);
    let reconciler = SyncReconciler::new(store.clone(), transport.clone(), ReconcilerConfig::default());

    reconciler.reconcile().await;
    let after_first = store.list_all().await.unwrap();

    let report = reconciler.reconcile().await;

    assert_eq!(report.outcome, PassOutcome::NothingToSync);
    assert_eq!(transport.calls(), 1);
    assert_eq!(store.list_all().await.unwrap(), after_first);
}

#[tokio::test]
async fn test_record_edited_during_submission_stays_pending() {
    struct EditingTransport {
        store: Arc<MemoryRecordStore>,
    }

    #[async_trait]
    impl SyncTransport for EditingTransport {
        async fn submit(&self, batch: &[MedicalRecord]) -> SyncResult<Vec<String>> {
            let mut edited = record("A");
            edited.treatment = "Antivirals".to_string();
            self.store.upsert(edited).await?;
            Ok(batch.iter().map(|r| r.id.clone()).collect())
        }
    }

    let store = Arc::new(MemoryRecordStore::with_records([record("A"), record("B")]));
    let transport = Arc::new(EditingTransport { store: store.clone() });
    let reconciler = SyncReconciler::new(store.clone(), transport, ReconcilerConfig::default());

    let report = reconciler.reconcile().await;

    assert_eq!(report.modified_in_flight, 1);
    let a = store.get_by_id("A").await.unwrap().unwrap();
    assert_eq!(a.sync_status, SyncStatus::Pending);
    assert_eq!(a.treatment, "Antivirals");
    assert_eq!(
        store.get_by_id("B").await.unwrap().unwrap().sync_status,
        SyncStatus::Synced
    );
}

#[tokio::test]
async fn test_edit_landing_just_before_status_write_stays_pending() {
    /// Store that applies a local edit right before the reconciler's status write
    struct InterleavingStore {
        inner: MemoryRecordStore,
        edit: Mutex<Option<MedicalRecord>>,
    }

    #[async_trait]
    impl RecordStore for InterleavingStore {
        async fn upsert(&self, record: MedicalRecord) -> SyncResult<()> {
            self.inner.upsert(record).await
        }

        async fn list_all(&self) -> SyncResult<Vec<MedicalRecord>> {
            self.inner.list_all().await
        }

        async fn get_by_id(&self, id: &str) -> SyncResult<Option<MedicalRecord>> {
            self.inner.get_by_id(id).await
        }

        async fn set_sync_status(&self, id: &str, status: SyncStatus) -> SyncResult<()> {
            self.inner.set_sync_status(id, status).await
        }

        async fn mark_synced_if_unchanged(&self, submitted: &MedicalRecord) -> SyncResult<SyncedMark> {
            let edit = self.edit.lock().unwrap().take();
            if let Some(edit) = edit {
                self.inner.upsert(edit).await?;
            }
            self.inner.mark_synced_if_unchanged(submitted).await
        }
    }

    let mut edited = record("A");
    edited.diagnosis = "Bronchitis".to_string();
    let store = Arc::new(InterleavingStore {
        inner: MemoryRecordStore::with_records([record("A")]),
        edit: Mutex::new(Some(edited)),
    });
    let transport = ScriptedTransport::new(Behavior::AcceptAll);
    let reconciler = SyncReconciler::new(store.clone(), transport, ReconcilerConfig::default());

    let report = reconciler.reconcile().await;

    assert_eq!(report.accepted, 0);
    assert_eq!(report.modified_in_flight, 1);
    let a = store.get_by_id("A").await.unwrap().unwrap();
    assert_eq!(a.sync_status, SyncStatus::Pending);
    assert_eq!(a.diagnosis, "Bronchitis");
}

#[tokio::test]
async fn test_overlapping_triggers_coalesce_into_one_follow_up() {
    struct GatedTransport {
        entered: Notify,
        release: Notify,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SyncTransport for GatedTransport {
        async fn submit(&self, batch: &[MedicalRecord]) -> SyncResult<Vec<String>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                self.entered.notify_one();
                self.release.notified().await;
            }
            Ok(batch.iter().map(|r| r.id.clone()).collect())
        }
    }

    let store = Arc::new(MemoryRecordStore::with_records([record("A")]));
    let transport = Arc::new(GatedTransport {
        entered: Notify::new(),
        release: Notify::new(),
        calls: AtomicUsize::new(0),
    });
    let reconciler = Arc::new(SyncReconciler::new(
        store.clone(),
        transport.clone(),
        ReconcilerConfig::default(),
    ));

    let first = tokio::spawn({
        let reconciler = reconciler.clone();
        async move { reconciler.reconcile().await }
    });

    transport.entered.notified().await;
    assert!(reconciler.is_running());

    // Written while the first batch is in flight; only a follow-up pass can send it.
    store.upsert(record("B")).await.unwrap();

    let second = reconciler.reconcile().await;
    let third = reconciler.reconcile().await;
    assert_eq!(second.outcome, PassOutcome::Coalesced);
    assert_eq!(third.outcome, PassOutcome::Coalesced);

    transport.release.notify_one();
    let first = first.await.unwrap();

    assert_eq!(first.passes, 2);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    assert!(store.list_unsynced().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_storage_failure_ends_pass_without_request() {
    struct BrokenStore;

    #[async_trait]
    impl RecordStore for BrokenStore {
        async fn upsert(&self, _record: MedicalRecord) -> SyncResult<()> {
            Err(SyncError::StorageUnavailable("disk full".to_string()))
        }

        async fn list_all(&self) -> SyncResult<Vec<MedicalRecord>> {
            Err(SyncError::StorageUnavailable("disk full".to_string()))
        }

        async fn get_by_id(&self, _id: &str) -> SyncResult<Option<MedicalRecord>> {
            Err(SyncError::StorageUnavailable("disk full".to_string()))
        }

        async fn set_sync_status(&self, _id: &str, _status: SyncStatus) -> SyncResult<()> {
            Err(SyncError::StorageUnavailable("disk full".to_string()))
        }

        async fn mark_synced_if_unchanged(&self, _submitted: &MedicalRecord) -> SyncResult<SyncedMark> {
            Err(SyncError::StorageUnavailable("disk full".to_string()))
        }
    }

    let transport = ScriptedTransport::new(Behavior::AcceptAll);
    let reconciler = SyncReconciler::new(Arc::new(BrokenStore), transport.clone(), ReconcilerConfig::default());

    let report = reconciler.reconcile().await;

    assert_eq!(report.outcome, PassOutcome::StorageFailed);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_sqlite_store_end_to_end() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig {
        db_path: dir.path().join("clinic.db").to_str().unwrap().to_string(),
        ..StoreConfig::default()
    };
    let store = Arc::new(SqliteRecordStore::new(&config).await.unwrap());
    for id in ["p1", "p2", "p3"] {
        store.upsert(record(id)).await.unwrap();
    }

    let allowed: HashSet<String> = ["p1", "p3"].iter().map(|s| s.to_string()).collect();
    let transport = ScriptedTransport::new(Behavior::AcceptOnly(allowed));
    let reconciler = SyncReconciler::new(store.clone(), transport.clone(), ReconcilerConfig::default());

    reconciler.reconcile().await;
    let unsynced: Vec<String> = store
        .list_unsynced()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(unsynced, vec!["p2"]);

    // The next pass only resubmits what is still unsynced.
    reconciler.reconcile().await;
    let batches = transport.batches.lock().unwrap().clone();
    assert_eq!(batches, vec![
        vec!["p1".to_string(), "p2".to_string(), "p3".to_string()],
        vec!["p2".to_string()],
    ]);
}
