use config_engine::{require_non_empty, require_positive, ConfigValidation};
use logger_redacted::LoggingConfig;
use serde::{Deserialize, Serialize};

use crate::verification::VerificationConfig;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address
    pub host: String,
    pub port: u16,
    /// Origins allowed by CORS; empty allows any origin
    pub cors_origins: Vec<String>,
    pub verification: VerificationConfig,
    pub logging: LoggingConfig,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
            verification: VerificationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ServerSettings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl ConfigValidation for ServerSettings {
    fn validate(&self) -> config_engine::Result<()> {
        require_non_empty("host", &self.host)?;
        require_positive("port", u64::from(self.port))?;
        self.verification.validate()
    }
}
