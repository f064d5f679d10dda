//! Dashboard metrics poller
//!
//! Fetches immediately, then on a fixed period for as long as the dashboard is
//! open. The poller is owned by its handle: shutting the handle down (or
//! dropping it) stops the task, and no request is issued afterwards.

use crate::api_client::ApiClient;
use std::time::Duration;
use suvidha_core::DashboardMetrics;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default polling period
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Shown while the metrics endpoint is failing
pub const FETCH_FAILED: &str = "Failed to securely fetch telemetry statistics.";

/// What the dashboard currently shows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSnapshot {
    /// Latest successfully fetched metrics
    pub metrics: Option<DashboardMetrics>,
    /// Message for the most recent failed fetch, cleared by the next success
    pub error: Option<String>,
    /// Fetches completed so far, successful or not
    pub fetches: u64,
}

impl DashboardSnapshot {
    /// Whether the first fetch is still outstanding
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.fetches == 0
    }
}

/// Spawns dashboard pollers
#[derive(Debug, Clone)]
pub struct MetricsPoller {
    client: ApiClient,
    interval: Duration,
}

impl MetricsPoller {
    /// Create a poller with the given period
    #[must_use]
    pub const fn new(client: ApiClient, interval: Duration) -> Self {
        Self { client, interval }
    }

    /// Start polling on the current tokio runtime
    #[must_use]
    pub fn spawn(self) -> PollerHandle {
        let (snapshot_tx, snapshot_rx) = watch::channel(DashboardSnapshot::default());
        let cancel = CancellationToken::new();

        info!(interval_secs = self.interval.as_secs(), "Starting dashboard poller");
        let task = tokio::spawn(self.run(snapshot_tx, cancel.clone()));

        PollerHandle {
            snapshot_rx,
            cancel,
            task: Some(task),
        }
    }

    async fn run(self, snapshot_tx: watch::Sender<DashboardSnapshot>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = self.client.dashboard_metrics() => result,
            };

            snapshot_tx.send_modify(|snapshot| {
                snapshot.fetches += 1;
                match result {
                    Ok(metrics) => {
                        debug!(
                            total = metrics.complaints.total,
                            resolved = metrics.complaints.resolved,
                            "Dashboard metrics refreshed"
                        );
                        snapshot.metrics = Some(metrics);
                        snapshot.error = None;
                    }
                    Err(e) => {
                        warn!("Dashboard metrics fetch failed: {}", e);
                        snapshot.error = Some(FETCH_FAILED.to_string());
                    }
                }
            });
        }

        debug!("Dashboard poller stopped");
    }
}

/// Owning handle to a running poller
#[derive(Debug)]
pub struct PollerHandle {
    snapshot_rx: watch::Receiver<DashboardSnapshot>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Latest snapshot
    #[must_use]
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Subscribe to snapshot updates
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Stop polling and wait for the task to finish
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
            && !e.is_cancelled()
        {
            error!("Dashboard poller task failed: {}", e);
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_starts_loading() {
        let snapshot = DashboardSnapshot::default();
        assert!(snapshot.is_loading());
        assert!(snapshot.metrics.is_none());
        assert!(snapshot.error.is_none());
    }
}
