use super::{
    normalize_email, AttemptGrant, CodeSender, VerificationConfig, VerificationEntry,
    VerificationError, VerificationStore,
};
use chrono::{Duration as ChronoDuration, Utc};
use logger_redacted::PiiRedactor;
use rand::Rng;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use validator::ValidateEmail;

/// Result of a successful issue request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCode {
    pub expires_in_secs: u64,
}

/// Issues and checks verification codes against an injected store
pub struct VerificationService {
    store: Arc<dyn VerificationStore>,
    sender: Arc<dyn CodeSender>,
    config: VerificationConfig,
    redactor: PiiRedactor,
}

impl VerificationService {
    pub fn new(
        store: Arc<dyn VerificationStore>,
        sender: Arc<dyn CodeSender>,
        config: VerificationConfig,
    ) -> Self {
        Self {
            store,
            sender,
            config,
            redactor: PiiRedactor::default(),
        }
    }

    #[must_use]
    pub fn with_redactor(mut self, redactor: PiiRedactor) -> Self {
        self.redactor = redactor;
        self
    }

    pub fn store(&self) -> &Arc<dyn VerificationStore> {
        &self.store
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    /// Issue a fresh code for `email`, replacing any previous one
    ///
    /// # Errors
    ///
    /// `InvalidEmail`, `Cooldown` when re-requested too soon, or `Delivery`.
    pub async fn issue(&self, email: &str) -> Result<IssuedCode, VerificationError> {
        let key = normalize_email(email);
        if !key.validate_email() {
            return Err(VerificationError::InvalidEmail);
        }

        let now = Utc::now();
        if let Some(existing) = self.store.get(&key).await {
            let elapsed = now.signed_duration_since(existing.issued_at).num_seconds();
            let cooldown = i64::try_from(self.config.resend_cooldown_secs).unwrap_or(i64::MAX);
            if !existing.is_expired(now) && elapsed < cooldown {
                let retry_after_secs = u64::try_from(cooldown - elapsed).unwrap_or(1).max(1);
                return Err(VerificationError::Cooldown { retry_after_secs });
            }
        }

        let code = generate_code(self.config.code_length);
        let ttl = ChronoDuration::seconds(i64::try_from(self.config.ttl_secs).unwrap_or(i64::MAX));
        let entry = VerificationEntry {
            code: code.clone(),
            issued_at: now,
            expires_at: now + ttl,
            attempts: 0,
        };
        self.store.put(&key, entry).await;

        if let Err(err) = self.sender.send(&key, &code).await {
            self.store.remove(&key).await;
            return Err(err);
        }

        tracing::info!(
            email = %self.redactor.redact_email(&key),
            ttl_secs = self.config.ttl_secs,
            "Verification code issued"
        );

        Ok(IssuedCode {
            expires_in_secs: self.config.ttl_secs,
        })
    }

    /// Check `code` for `email`; the entry is consumed on success
    ///
    /// # Errors
    ///
    /// `NotFound`, `Expired`, `InvalidCode` with the attempts left, or
    /// `TooManyAttempts` once the limit is reached.
    pub async fn verify(&self, email: &str, code: &str) -> Result<(), VerificationError> {
        let key = normalize_email(email);
        let redacted = self.redactor.redact_email(&key);

        let max_attempts = self.config.max_attempts;
        let entry = match self.store.begin_attempt(&key, max_attempts, Utc::now()).await {
            AttemptGrant::Granted(entry) => entry,
            AttemptGrant::Missing => return Err(VerificationError::NotFound),
            AttemptGrant::Expired => {
                tracing::info!(email = %redacted, "Verification code expired");
                return Err(VerificationError::Expired);
            }
            AttemptGrant::Exhausted => return Err(VerificationError::TooManyAttempts),
        };

        if codes_match(&entry.code, code.trim()) {
            self.store.remove(&key).await;
            tracing::info!(email = %redacted, "Email verified");
            return Ok(());
        }

        let attempts = entry.attempts;
        let remaining_attempts = max_attempts.saturating_sub(attempts);

        tracing::warn!(email = %redacted, attempts, remaining_attempts, "Verification code mismatch");

        if remaining_attempts == 0 {
            self.store.remove(&key).await;
            return Err(VerificationError::TooManyAttempts);
        }

        Err(VerificationError::InvalidCode { remaining_attempts })
    }
}

fn generate_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

fn codes_match(expected: &str, submitted: &str) -> bool {
    expected.as_bytes().ct_eq(submitted.as_bytes()).into()
}
