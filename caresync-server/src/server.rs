use logger_redacted::{PiiRedactor, RedactionConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::settings::ServerSettings;
use crate::verification::{
    CodeSender, LogCodeSender, MemoryVerificationStore, VerificationService, VerificationStore,
};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct CareSyncServer {
    settings: Arc<ServerSettings>,
    verification: Arc<VerificationService>,
    started_at: Instant,
}

impl CareSyncServer {
    /// In-memory verification store and log delivery
    pub fn new(settings: ServerSettings) -> Self {
        let redactor = PiiRedactor::new(RedactionConfig::from(&settings.logging));
        Self::with_verification_backend(
            settings,
            Arc::new(MemoryVerificationStore::new()),
            Arc::new(LogCodeSender::new(redactor)),
        )
    }

    /// Inject the code store and sender, e.g. a shared store across instances
    pub fn with_verification_backend(
        settings: ServerSettings,
        store: Arc<dyn VerificationStore>,
        sender: Arc<dyn CodeSender>,
    ) -> Self {
        let redactor = PiiRedactor::new(RedactionConfig::from(&settings.logging));
        let verification =
            VerificationService::new(store, sender, settings.verification.clone())
                .with_redactor(redactor);

        Self {
            settings: Arc::new(settings),
            verification: Arc::new(verification),
            started_at: Instant::now(),
        }
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    pub fn verification(&self) -> &VerificationService {
        &self.verification
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
