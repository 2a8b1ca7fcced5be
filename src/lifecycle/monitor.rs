//! Stale-session sweep and global idle watch

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::shutdown::{initiate_shutdown, ShutdownSignal};
use crate::registry::SessionRegistry;

/// Handle to the running lifecycle timers
pub struct LifecycleMonitor {
    cancel: CancellationToken,
    sweep: JoinHandle<()>,
    idle_watch: JoinHandle<()>,
}

impl LifecycleMonitor {
    /// Spawn both timers
    ///
    /// Intervals and timeouts come from the registry's configuration.
    pub fn spawn(registry: Arc<SessionRegistry>, shutdown: ShutdownSignal) -> Self {
        let cancel = CancellationToken::new();

        let sweep = tokio::spawn(run_sweep(Arc::clone(&registry), cancel.clone()));
        let idle_watch = tokio::spawn(run_idle_watch(registry, shutdown, cancel.clone()));

        Self {
            cancel,
            sweep,
            idle_watch,
        }
    }

    /// Cancel both timers and wait for them to finish
    pub async fn stop(self) {
        self.cancel.cancel();

        for (name, handle) in [("sweep", self.sweep), ("idle_watch", self.idle_watch)] {
            if let Err(e) = handle.await {
                tracing::warn!(task = name, error = %e, "Lifecycle task ended abnormally");
            }
        }

        tracing::debug!("Lifecycle monitor stopped");
    }
}

async fn run_sweep(registry: Arc<SessionRegistry>, cancel: CancellationToken) {
    let period = registry.config().sweep_interval;
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let evicted = registry.evict_stale().await;
                if !evicted.is_empty() {
                    tracing::info!(evicted = evicted.len(), "Stale sweep finished");
                }
            }
        }
    }
}

async fn run_idle_watch(
    registry: Arc<SessionRegistry>,
    shutdown: ShutdownSignal,
    cancel: CancellationToken,
) {
    let period = registry.config().idle_check_interval;
    let timeout = registry.config().idle_shutdown_timeout;
    let grace = registry.config().shutdown_grace;
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        if registry.is_shutting_down() {
            return;
        }

        let Some(idle) = registry.idle_elapsed(Instant::now()).await else {
            continue;
        };

        if idle > timeout {
            tracing::info!(
                idle_secs = idle.as_secs(),
                timeout_secs = timeout.as_secs(),
                "No sessions for too long, shutting down"
            );

            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = initiate_shutdown(registry, shutdown, grace) => {}
            }
            return;
        }
    }
}
