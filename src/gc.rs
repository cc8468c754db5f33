//! Background eviction of unused cache entries
//!
//! Runs [`QueryClient::collect_garbage`] on a fixed interval in a tokio task
//! until shut down.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::QueryClient;

/// Handle for controlling the background eviction sweeper
pub struct GcHandle {
    /// Signals the sweeper to stop
    shutdown_tx: mpsc::Sender<()>,
    /// Sweeper task; `None` when eviction is disabled
    join: Option<JoinHandle<()>>,
}

impl GcHandle {
    /// Spawns the sweeper according to the client's [`CacheConfig`](crate::config::CacheConfig)
    ///
    /// With `gc_enabled = false` nothing is spawned and entries are only
    /// evicted by explicit `collect_garbage` calls.
    pub fn spawn(client: QueryClient) -> Self {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let config = client.config().clone();

        if !config.gc_enabled || config.gc_interval.is_zero() {
            return Self {
                shutdown_tx,
                join: None,
            };
        }

        let join = tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.gc_interval);
            // Skip the first tick (immediate)
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let evicted = client.collect_garbage();
                        if evicted > 0 {
                            debug!(evicted, "eviction pass finished");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            shutdown_tx,
            join: Some(join),
        }
    }

    /// Whether a sweeper task is running
    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|join| !join.is_finished())
    }

    /// Stops the sweeper and waits for it to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Some(join) = self.join {
            let _ = join.await;
        }
    }
}
