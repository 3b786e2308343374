//! Record store abstraction
//!
//! The store exclusively owns the persisted record collection. Every
//! operation is an atomic read-modify-write: no two writes can interleave
//! such that one overwrites the other's intermediate state.

use crate::error::SyncResult;
use crate::record::{MedicalRecord, SyncStatus};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Asynchronous persistence for medical records, addressable by id.
///
/// Implementations never infer a record's status; they persist what they are
/// given. Storage failures surface as [`crate::SyncError::StorageUnavailable`]
/// and are not retried here.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Replace the record with the same id, or append it.
    ///
    /// An update keeps the record's position in [`RecordStore::list_all`].
    async fn upsert(&self, record: MedicalRecord) -> SyncResult<()>;

    /// All records in append order.
    async fn list_all(&self) -> SyncResult<Vec<MedicalRecord>>;

    /// The record with the given id, or `None`. Absence is not an error.
    async fn get_by_id(&self, id: &str) -> SyncResult<Option<MedicalRecord>>;

    /// Records that still need syncing (`pending` or `error`), in the same
    /// relative order as [`RecordStore::list_all`].
    async fn list_unsynced(&self) -> SyncResult<Vec<MedicalRecord>> {
        let records = self.list_all().await?;
        Ok(records
            .into_iter()
            .filter(|record| !record.sync_status.is_synced())
            .collect())
    }

    /// Update a record's status in place. Unknown ids are a no-op.
    async fn set_sync_status(&self, id: &str, status: SyncStatus) -> SyncResult<()>;

    /// Mark `submitted` as `synced` only if the stored copy still carries the
    /// same content. The comparison and the write are one atomic step.
    async fn mark_synced_if_unchanged(&self, submitted: &MedicalRecord) -> SyncResult<SyncedMark>;
}

/// Outcome of [`RecordStore::mark_synced_if_unchanged`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncedMark {
    Marked,
    /// The record was edited after it was submitted; status left as-is
    Modified,
    Missing,
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    async fn upsert(&self, record: MedicalRecord) -> SyncResult<()> {
        (**self).upsert(record).await
    }

    async fn list_all(&self) -> SyncResult<Vec<MedicalRecord>> {
        (**self).list_all().await
    }

    async fn get_by_id(&self, id: &str) -> SyncResult<Option<MedicalRecord>> {
        (**self).get_by_id(id).await
    }

    async fn list_unsynced(&self) -> SyncResult<Vec<MedicalRecord>> {
        (**self).list_unsynced().await
    }

    async fn set_sync_status(&self, id: &str, status: SyncStatus) -> SyncResult<()> {
        (**self).set_sync_status(id, status).await
    }

    async fn mark_synced_if_unchanged(&self, submitted: &MedicalRecord) -> SyncResult<SyncedMark> {
        (**self).mark_synced_if_unchanged(submitted).await
    }
}

/// In-process record store, used for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<Vec<MedicalRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with records, applying upsert semantics in order.
    pub fn with_records(records: impl IntoIterator<Item = MedicalRecord>) -> Self {
        let mut collection: Vec<MedicalRecord> = Vec::new();
        for record in records {
            upsert_in_place(&mut collection, record);
        }
        Self {
            records: RwLock::new(collection),
        }
    }
}

fn upsert_in_place(collection: &mut Vec<MedicalRecord>, record: MedicalRecord) {
    match collection.iter_mut().find(|existing| existing.id == record.id) {
        Some(existing) => *existing = record,
        None => collection.push(record),
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn upsert(&self, record: MedicalRecord) -> SyncResult<()> {
        let mut records = self.records.write().await;
        tracing::debug!(record_id = %record.id, status = %record.sync_status, "Upserting record");
        upsert_in_place(&mut records, record);
        Ok(())
    }

    async fn list_all(&self) -> SyncResult<Vec<MedicalRecord>> {
        Ok(self.records.read().await.clone())
    }

    async fn get_by_id(&self, id: &str) -> SyncResult<Option<MedicalRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|record| record.id == id)
            .cloned())
    }

    async fn set_sync_status(&self, id: &str, status: SyncStatus) -> SyncResult<()> {
        let mut records = self.records.write().await;
        if let Some(record) = records.iter_mut().find(|record| record.id == id) {
            record.sync_status = status;
        } else {
            tracing::debug!(record_id = id, "Status update for unknown record ignored");
        }
        Ok(())
    }

    async fn mark_synced_if_unchanged(&self, submitted: &MedicalRecord) -> SyncResult<SyncedMark> {
        let mut records = self.records.write().await;
        let mark = match records.iter_mut().find(|record| record.id == submitted.id) {
            Some(record) if record.same_content(submitted) => {
                record.sync_status = SyncStatus::Synced;
                SyncedMark::Marked
            }
            Some(_) => SyncedMark::Modified,
            None => SyncedMark::Missing,
        };
        Ok(mark)
    }
}
