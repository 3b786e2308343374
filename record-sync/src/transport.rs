//! Remote acceptance endpoint client
//!
//! The whole unsynced set goes out in one request; the endpoint answers with
//! the subset of ids it accepted.

use crate::error::{SyncError, SyncResult};
use crate::record::MedicalRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Response body of the acceptance endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceResponse {
    /// Submitted ids the server accepted
    pub synced: Vec<String>,
}

/// Submits a batch of records and reports which ids were accepted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// # Errors
    ///
    /// Any failure of the request as a whole (connection, non-2xx status,
    /// unreadable body).
    async fn submit(&self, batch: &[MedicalRecord]) -> SyncResult<Vec<String>>;
}

/// Configuration for the HTTP transport
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpTransportConfig {
    /// Full URL of the acceptance endpoint
    pub endpoint_url: String,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "http://localhost:8080/api/sync".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

/// [`SyncTransport`] that POSTs the batch as a JSON array
pub struct HttpSyncTransport {
    client: reqwest::Client,
    endpoint_url: String,
}

impl HttpSyncTransport {
    /// # Errors
    ///
    /// Returns `SyncNetworkFailure` if the HTTP client cannot be built.
    pub fn new(config: &HttpTransportConfig) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint_url: config.endpoint_url.clone(),
        })
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }
}

#[async_trait]
impl SyncTransport for HttpSyncTransport {
    async fn submit(&self, batch: &[MedicalRecord]) -> SyncResult<Vec<String>> {
        let response = self
            .client
            .post(&self.endpoint_url)
            .json(batch)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::SyncNetworkFailure(format!(
                "Sync endpoint responded with status: {status}"
            )));
        }

        let body: AcceptanceResponse = response.json().await?;

        tracing::debug!(
            endpoint = %self.endpoint_url,
            submitted = batch.len(),
            accepted = body.synced.len(),
            "Batch submitted"
        );

        Ok(body.synced)
    }
}
