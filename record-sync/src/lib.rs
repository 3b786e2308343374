//! Offline-first record synchronization for CareSync
//!
//! Provides:
//! - Local record store (SQLite or in-memory) for offline operation
//! - Batch reconciliation against a remote acceptance endpoint
//! - Network-state monitoring with automatic re-sync on reconnect

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing, clippy::panic)
)]

pub mod error;
pub mod record;
pub mod store;
pub mod local_db;
pub mod transport;
pub mod reconciler;
pub mod network;

pub use error::{SyncError, SyncResult};
pub use record::{MedicalRecord, SyncStatus};
pub use store::{MemoryRecordStore, RecordStore, SyncedMark};
pub use local_db::{SqliteRecordStore, StoreConfig};
pub use transport::{AcceptanceResponse, HttpSyncTransport, HttpTransportConfig, SyncTransport};
pub use reconciler::{PassOutcome, ReconcileReport, ReconcilerConfig, SyncReconciler};
pub use network::{
    spawn_probe, AutoSync, AutoSyncHandle, ConnectivityProbe, HttpHealthProbe, NetworkMonitor,
    NetworkState, NetworkStatus,
};

/// Reconciler over the SQLite store and HTTP transport
pub type HttpSqliteReconciler = SyncReconciler<SqliteRecordStore, HttpSyncTransport>;

/// Open the local database and wire it to the acceptance endpoint
///
/// # Errors
///
/// Fails if the database cannot be opened or the HTTP client cannot be built.
pub async fn connect(
    store_config: &StoreConfig,
    transport_config: &HttpTransportConfig,
    reconciler_config: ReconcilerConfig,
) -> SyncResult<HttpSqliteReconciler> {
    let store = SqliteRecordStore::new(store_config).await?;
    let transport = HttpSyncTransport::new(transport_config)?;

    Ok(SyncReconciler::new(
        std::sync::Arc::new(store),
        std::sync::Arc::new(transport),
        reconciler_config,
    ))
}
