//! Logging for CareSync with automatic PII/PHI redaction
//!
//! Two pieces:
//!
//! - [`init_tracing`] installs the process-wide `tracing` subscriber
//!   (pretty or JSON on stdout, optional daily-rotated JSON files).
//! - [`PiiRedactor`] scrubs emails, phone numbers, SSNs and medical record
//!   numbers from text before it is logged. With correlation hashing on,
//!   each value becomes a short stable tag so related lines can still be
//!   joined without exposing the value.
//!
//! Patient names and clinical content are never handed to the logger; only
//! record ids are.
//!
//! # Example
//!
//! ```rust,no_run
//! use logger_redacted::{init_tracing, LoggingConfig, PiiRedactor};
//!
//! let _guard = init_tracing(&LoggingConfig::default()).unwrap();
//! let redactor = PiiRedactor::default();
//! tracing::info!(email = %redactor.redact_email("jane@clinic.org"), "Verification code issued");
//! ```

pub mod config;
pub mod redactor;
pub mod subscriber;

pub use config::*;
pub use redactor::*;
pub use subscriber::*;

impl From<&LoggingConfig> for RedactionConfig {
    fn from(config: &LoggingConfig) -> Self {
        RedactionConfig {
            enabled: config.redaction_enabled,
            ..RedactionConfig::default()
        }
    }
}
