//! Shutdown coordination.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Coordinator for graceful shutdown.
///
/// Every long-running task (server, limiter cleanup, resource sampler)
/// subscribes and exits when the signal fires.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of tasks still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Wait for `tasks` to finish, giving up after `grace`.
    ///
    /// Returns how many tasks had not finished in time.
    pub async fn drain(tasks: Vec<JoinHandle<()>>, grace: Duration) -> usize {
        let total = tasks.len();
        let mut finished = 0;

        let wait_all = async {
            for task in tasks {
                if let Err(e) = task.await {
                    tracing::warn!(error = %e, "Background task ended abnormally");
                }
                finished += 1;
            }
        };

        if tokio::time::timeout(grace, wait_all).await.is_err() {
            tracing::warn!(
                pending = total - finished,
                grace = ?grace,
                "Background tasks still running after grace period"
            );
        }
        total - finished
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
