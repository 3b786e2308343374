//! Error types for the record store and sync reconciler

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// The local persistence layer failed to read or write.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The batch submission failed (network error or non-2xx response).
    #[error("Sync network failure: {0}")]
    SyncNetworkFailure(String),

    #[error("Sync request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid sync status: {0}")]
    InvalidStatus(String),
}

impl SyncError {
    /// Whether the error came from the remote side of a sync attempt.
    ///
    /// The reconciler treats all of these the same way: the whole batch is
    /// marked `error` and retried on the next trigger.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            SyncError::SyncNetworkFailure(_) | SyncError::Timeout(_) | SyncError::Serialization(_)
        )
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        SyncError::StorageUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SyncError::Serialization(err.to_string())
        } else {
            SyncError::SyncNetworkFailure(err.to_string())
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
