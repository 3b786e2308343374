//! Professional email verification codes
//!
//! A short numeric code is issued per email address and kept in a
//! [`VerificationStore`] with an expiry and an attempt counter. The store is
//! injected so a shared backend can replace the in-memory one when the
//! server runs as more than one instance.

mod sender;
mod service;
mod store;

pub use sender::{CodeSender, LogCodeSender};
pub use service::{IssuedCode, VerificationService};
pub use store::{
    spawn_purge_task, AttemptGrant, MemoryVerificationStore, VerificationEntry, VerificationStore,
};

use config_engine::{require_positive, ConfigValidation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("A valid email address is required")]
    InvalidEmail,

    #[error("A verification code was sent recently. Try again in {retry_after_secs} seconds.")]
    Cooldown { retry_after_secs: u64 },

    #[error("No verification code found for this email. Request a new code.")]
    NotFound,

    #[error("Verification code has expired. Request a new code.")]
    Expired,

    #[error("Invalid verification code")]
    InvalidCode { remaining_attempts: u32 },

    #[error("Too many failed attempts. Request a new code.")]
    TooManyAttempts,

    #[error("Code delivery failed: {0}")]
    Delivery(String),
}

/// Verification code settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Number of digits in a code
    pub code_length: usize,
    pub ttl_secs: u64,
    pub max_attempts: u32,
    /// Minimum delay before a new code may be issued for the same email
    pub resend_cooldown_secs: u64,
    /// How often expired entries are swept from the store
    pub purge_interval_secs: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            ttl_secs: 600,
            max_attempts: 5,
            resend_cooldown_secs: 30,
            purge_interval_secs: 60,
        }
    }
}

impl ConfigValidation for VerificationConfig {
    fn validate(&self) -> config_engine::Result<()> {
        if !(4..=10).contains(&self.code_length) {
            return Err(config_engine::ConfigError::ValidationError(
                "verification.code_length must be between 4 and 10".to_string(),
            ));
        }
        require_positive("verification.ttl_secs", self.ttl_secs)?;
        require_positive("verification.max_attempts", u64::from(self.max_attempts))?;
        require_positive("verification.purge_interval_secs", self.purge_interval_secs)
    }
}

/// Lookup key for an email address
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
