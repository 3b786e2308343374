use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// A pending code for one email address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationEntry {
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Failed attempts so far
    pub attempts: u32,
}

impl VerificationEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Outcome of reserving one guess against a stored code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptGrant {
    Missing,
    /// Past its expiry; the entry has been removed
    Expired,
    /// Attempt limit already reached; the entry has been removed
    Exhausted,
    /// The guess may be compared. `attempts` already counts it.
    Granted(VerificationEntry),
}

/// Keyed storage for pending codes
#[async_trait]
pub trait VerificationStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<VerificationEntry>;

    /// Insert or replace the entry for `key`
    async fn put(&self, key: &str, entry: VerificationEntry);

    async fn remove(&self, key: &str) -> Option<VerificationEntry>;

    /// Reserve one attempt for `key` before the code is compared.
    ///
    /// The expiry check, the limit check and the counter bump happen as one
    /// atomic step, so concurrent guesses can never exceed `max_attempts`.
    async fn begin_attempt(&self, key: &str, max_attempts: u32, now: DateTime<Utc>) -> AttemptGrant;

    /// Drop every entry expired at `now`; returns how many were removed
    async fn purge_expired(&self, now: DateTime<Utc>) -> usize;
}

#[derive(Debug, Default)]
pub struct MemoryVerificationStore {
    entries: DashMap<String, VerificationEntry>,
}

impl MemoryVerificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl VerificationStore for MemoryVerificationStore {
    async fn get(&self, key: &str) -> Option<VerificationEntry> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    async fn put(&self, key: &str, entry: VerificationEntry) {
        self.entries.insert(key.to_string(), entry);
    }

    async fn remove(&self, key: &str) -> Option<VerificationEntry> {
        self.entries.remove(key).map(|(_, entry)| entry)
    }

    async fn begin_attempt(&self, key: &str, max_attempts: u32, now: DateTime<Utc>) -> AttemptGrant {
        match self.entries.entry(key.to_string()) {
            Entry::Vacant(_) => AttemptGrant::Missing,
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    occupied.remove();
                    return AttemptGrant::Expired;
                }
                if occupied.get().attempts >= max_attempts {
                    occupied.remove();
                    return AttemptGrant::Exhausted;
                }
                let entry = occupied.get_mut();
                entry.attempts = entry.attempts.saturating_add(1);
                AttemptGrant::Granted(entry.clone())
            }
        }
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }
}

/// Periodically sweep expired codes out of `store`
pub fn spawn_purge_task(store: Arc<dyn VerificationStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let purged = store.purge_expired(Utc::now()).await;
            if purged > 0 {
                tracing::debug!(purged, "Expired verification codes removed");
            }
        }
    })
}
