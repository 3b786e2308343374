use super::VerificationError;
use async_trait::async_trait;
use logger_redacted::PiiRedactor;

/// Delivers an issued code to its owner
#[async_trait]
pub trait CodeSender: Send + Sync {
    /// # Errors
    ///
    /// [`VerificationError::Delivery`] when the code could not be handed off.
    async fn send(&self, email: &str, code: &str) -> Result<(), VerificationError>;
}

/// Development sender: writes the code to the log with the address redacted
#[derive(Debug, Clone, Default)]
pub struct LogCodeSender {
    redactor: PiiRedactor,
}

impl LogCodeSender {
    pub fn new(redactor: PiiRedactor) -> Self {
        Self { redactor }
    }
}

#[async_trait]
impl CodeSender for LogCodeSender {
    async fn send(&self, email: &str, code: &str) -> Result<(), VerificationError> {
        tracing::info!(
            email = %self.redactor.redact_email(email),
            code = %code,
            "Verification code issued (log delivery)"
        );
        Ok(())
    }
}
