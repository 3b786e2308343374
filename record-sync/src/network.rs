//! Network state observation and automatic reconciliation
//!
//! [`NetworkMonitor`] publishes online/offline transitions. [`AutoSync`]
//! subscribes to them and runs a reconciliation pass at startup (when
//! online) and on every offline→online transition.

use crate::reconciler::SyncReconciler;
use crate::store::RecordStore;
use crate::transport::SyncTransport;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkStatus {
    Online,
    Offline,
}

impl NetworkStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, NetworkStatus::Online)
    }
}

/// Connectivity snapshot published by [`NetworkMonitor`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkState {
    pub status: NetworkStatus,
    /// Number of offline→online transitions seen so far
    pub online_epoch: u64,
}

/// Holds the current connectivity state and notifies subscribers of changes
///
/// A watch channel only keeps the latest value, so a subscriber that is busy
/// while the link drops and comes back would see `Online` twice. The epoch
/// counter lets it notice the reconnect anyway.
#[derive(Clone, Debug)]
pub struct NetworkMonitor {
    sender: Arc<watch::Sender<NetworkState>>,
}

impl NetworkMonitor {
    pub fn new(initial: NetworkStatus) -> Self {
        let (sender, _receiver) = watch::channel(NetworkState {
            status: initial,
            online_epoch: 0,
        });
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn status(&self) -> NetworkStatus {
        self.sender.borrow().status
    }

    pub fn online_epoch(&self) -> u64 {
        self.sender.borrow().online_epoch
    }

    /// Publish a new status. Returns `true` if it differs from the previous one.
    pub fn set_status(&self, status: NetworkStatus) -> bool {
        let changed = self.sender.send_if_modified(|current| {
            if current.status == status {
                return false;
            }
            if status.is_online() {
                current.online_epoch = current.online_epoch.wrapping_add(1);
            }
            current.status = status;
            true
        });

        if changed {
            tracing::info!(status = ?status, "Network status changed");
        }

        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<NetworkState> {
        self.sender.subscribe()
    }
}

/// Answers "can we reach the sync server right now?"
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Probe that GETs a health URL; any 2xx counts as online
pub struct HttpHealthProbe {
    client: reqwest::Client,
    health_url: String,
}

impl HttpHealthProbe {
    /// # Errors
    ///
    /// Returns `SyncNetworkFailure` if the HTTP client cannot be built.
    pub fn new(health_url: impl Into<String>, timeout: Duration) -> crate::SyncResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            health_url: health_url.into(),
        })
    }
}

#[async_trait]
impl ConnectivityProbe for HttpHealthProbe {
    async fn is_online(&self) -> bool {
        match self.client.get(&self.health_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::trace!(error = %e, "Health probe failed");
                false
            }
        }
    }
}

/// Poll `probe` every `interval` and publish the result to `monitor`
pub fn spawn_probe(
    monitor: NetworkMonitor,
    probe: Arc<dyn ConnectivityProbe>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let status = if probe.is_online().await {
                NetworkStatus::Online
            } else {
                NetworkStatus::Offline
            };
            monitor.set_status(status);
        }
    })
}

/// Handle to a running [`AutoSync`] task. Dropping it stops the task.
pub struct AutoSyncHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl AutoSyncHandle {
    /// Stop listening for transitions and wait for an in-progress pass to end
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Auto-sync task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Drives a [`SyncReconciler`] from network transitions
pub struct AutoSync;

impl AutoSync {
    pub fn spawn<S, T>(reconciler: Arc<SyncReconciler<S, T>>, monitor: &NetworkMonitor) -> AutoSyncHandle
    where
        S: RecordStore + ?Sized + 'static,
        T: SyncTransport + ?Sized + 'static,
    {
        let mut state_rx = monitor.subscribe();
        let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let initial = *state_rx.borrow_and_update();
            let mut seen_epoch = initial.online_epoch;

            if initial.status.is_online() {
                tracing::debug!("Online at startup; running initial reconciliation");
                reconciler.reconcile().await;
            }

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    changed = state_rx.changed() => {
                        if changed.is_err() {
                            // Monitor dropped; nothing left to observe.
                            break;
                        }
                        let state = *state_rx.borrow_and_update();
                        if state.online_epoch != seen_epoch {
                            // Reconnects that happened during a pass collapse into one.
                            seen_epoch = state.online_epoch;
                            tracing::info!(online_epoch = seen_epoch, "Connectivity restored; reconciling");
                            reconciler.reconcile().await;
                        }
                    }
                }
            }

            tracing::debug!("Auto-sync stopped");
        });

        AutoSyncHandle { shutdown, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncResult;
    use crate::reconciler::ReconcilerConfig;
    use crate::record::{MedicalRecord, SyncStatus};
    use crate::store::MemoryRecordStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SyncTransport for CountingTransport {
        async fn submit(&self, batch: &[MedicalRecord]) -> SyncResult<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(batch.iter().map(|r| r.id.clone()).collect())
        }
    }

    async fn wait_for(condition: impl Fn() -> bool) -> bool {
        for _ in 0..100 {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        condition()
    }

    fn pending(id: &str) -> MedicalRecord {
        MedicalRecord::new_pending(id, "Jane", "Flu", "Rest", "2024-01-01", "drA")
    }

    #[test]
    fn test_set_status_reports_changes_only() {
        let monitor = NetworkMonitor::new(NetworkStatus::Offline);
        assert!(!monitor.set_status(NetworkStatus::Offline));
        assert!(monitor.set_status(NetworkStatus::Online));
        assert_eq!(monitor.status(), NetworkStatus::Online);
    }

    #[test]
    fn test_online_epoch_counts_reconnects() {
        let monitor = NetworkMonitor::new(NetworkStatus::Online);
        assert_eq!(monitor.online_epoch(), 0);

        monitor.set_status(NetworkStatus::Offline);
        assert_eq!(monitor.online_epoch(), 0);
        monitor.set_status(NetworkStatus::Online);
        monitor.set_status(NetworkStatus::Online);
        assert_eq!(monitor.online_epoch(), 1);

        monitor.set_status(NetworkStatus::Offline);
        monitor.set_status(NetworkStatus::Online);
        assert_eq!(monitor.online_epoch(), 2);
    }

    #[tokio::test]
    async fn test_reconciles_on_offline_to_online() {
        let store = Arc::new(MemoryRecordStore::with_records([pending("a")]));
        let transport = Arc::new(CountingTransport::default());
        let reconciler = Arc::new(SyncReconciler::new(
            store.clone(),
            transport.clone(),
            ReconcilerConfig::default(),
        ));

        let monitor = NetworkMonitor::new(NetworkStatus::Offline);
        let handle = AutoSync::spawn(reconciler, &monitor);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);

        monitor.set_status(NetworkStatus::Online);
        assert!(wait_for(|| transport.calls.load(Ordering::SeqCst) == 1).await);

        let mut synced = false;
        for _ in 0..100 {
            let record = store.get_by_id("a").await.unwrap().unwrap();
            if record.sync_status == SyncStatus::Synced {
                synced = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(synced);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_initial_pass_when_online() {
        let store = Arc::new(MemoryRecordStore::with_records([pending("a")]));
        let transport = Arc::new(CountingTransport::default());
        let reconciler = Arc::new(SyncReconciler::new(
            store,
            transport.clone(),
            ReconcilerConfig::default(),
        ));

        let monitor = NetworkMonitor::new(NetworkStatus::Online);
        let handle = AutoSync::spawn(reconciler, &monitor);

        assert!(wait_for(|| transport.calls.load(Ordering::SeqCst) == 1).await);

        // Online -> Online is not a transition.
        monitor.set_status(NetworkStatus::Online);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_reconnect_during_pass_triggers_another_pass() {
        /// Drops and restores the link while the first batch is in flight
        struct FlappingTransport {
            monitor: NetworkMonitor,
            calls: AtomicUsize,
        }

        #[async_trait]
        impl SyncTransport for FlappingTransport {
            async fn submit(&self, batch: &[MedicalRecord]) -> SyncResult<Vec<String>> {
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    self.monitor.set_status(NetworkStatus::Offline);
                    self.monitor.set_status(NetworkStatus::Online);
                    return Err(crate::SyncError::SyncNetworkFailure(
                        "connection reset".to_string(),
                    ));
                }
                Ok(batch.iter().map(|r| r.id.clone()).collect())
            }
        }

        let store = Arc::new(MemoryRecordStore::with_records([pending("a")]));
        let monitor = NetworkMonitor::new(NetworkStatus::Online);
        let transport = Arc::new(FlappingTransport {
            monitor: monitor.clone(),
            calls: AtomicUsize::new(0),
        });
        let reconciler = Arc::new(SyncReconciler::new(
            store.clone(),
            transport.clone(),
            ReconcilerConfig::default(),
        ));

        let handle = AutoSync::spawn(reconciler, &monitor);

        assert!(wait_for(|| transport.calls.load(Ordering::SeqCst) == 2).await);

        let mut synced = false;
        for _ in 0..100 {
            let record = store.get_by_id("a").await.unwrap().unwrap();
            if record.sync_status == SyncStatus::Synced {
                synced = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(synced);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_probe_publishes_status() {
        struct AlwaysOnline;

        #[async_trait]
        impl ConnectivityProbe for AlwaysOnline {
            async fn is_online(&self) -> bool {
                true
            }
        }

        let monitor = NetworkMonitor::new(NetworkStatus::Offline);
        let task = spawn_probe(monitor.clone(), Arc::new(AlwaysOnline), Duration::from_millis(5));

        assert!(wait_for(|| monitor.status() == NetworkStatus::Online).await);
        task.abort();
    }
}
