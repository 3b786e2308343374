use config_engine::{require_non_empty, require_positive, ConfigValidation};
use logger_redacted::LoggingConfig;
use record_sync::{HttpTransportConfig, ReconcilerConfig, StoreConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Remote endpoint and connectivity settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Acceptance endpoint, e.g. `http://localhost:8080/api/sync`
    pub endpoint_url: String,
    pub connect_timeout_secs: u64,
    /// Bound on a whole batch submission
    pub submit_timeout_secs: u64,
    /// Probed by `watch`; derived from `endpoint_url` when unset
    pub health_url: Option<String>,
    pub probe_interval_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        let transport = HttpTransportConfig::default();
        Self {
            endpoint_url: transport.endpoint_url,
            connect_timeout_secs: transport.connect_timeout_secs,
            submit_timeout_secs: ReconcilerConfig::default().submit_timeout.as_secs(),
            health_url: None,
            probe_interval_secs: 15,
        }
    }
}

impl SyncSettings {
    pub fn transport(&self) -> HttpTransportConfig {
        HttpTransportConfig {
            endpoint_url: self.endpoint_url.clone(),
            connect_timeout_secs: self.connect_timeout_secs,
        }
    }

    pub fn reconciler(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            submit_timeout: Duration::from_secs(self.submit_timeout_secs),
        }
    }

    /// Configured health URL, or `/health` on the endpoint's origin
    pub fn health_url(&self) -> String {
        if let Some(url) = &self.health_url {
            return url.clone();
        }
        let origin = match self.endpoint_url.find("://") {
            Some(scheme_end) => {
                let rest = &self.endpoint_url[scheme_end + 3..];
                let host_len = rest.find('/').unwrap_or(rest.len());
                &self.endpoint_url[..scheme_end + 3 + host_len]
            }
            None => self.endpoint_url.trim_end_matches('/'),
        };
        format!("{origin}/health")
    }
}

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliSettings {
    pub store: StoreConfig,
    pub sync: SyncSettings,
    pub logging: LoggingConfig,
}

impl ConfigValidation for CliSettings {
    fn validate(&self) -> config_engine::Result<()> {
        require_non_empty("store.db_path", &self.store.db_path)?;
        require_positive("store.max_connections", u64::from(self.store.max_connections))?;
        require_non_empty("sync.endpoint_url", &self.sync.endpoint_url)?;
        require_positive("sync.submit_timeout_secs", self.sync.submit_timeout_secs)?;
        require_positive("sync.probe_interval_secs", self.sync.probe_interval_secs)
    }
}
