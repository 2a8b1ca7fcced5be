//! Process shutdown signalling

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::registry::SessionRegistry;

/// One-shot, cloneable "time to exit" signal
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request process exit
    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until exit has been requested
    pub async fn wait(&self) {
        self.token.cancelled().await;
    }
}

/// Stop accepting work, wait out the grace period, then signal exit
pub async fn initiate_shutdown(
    registry: Arc<SessionRegistry>,
    signal: ShutdownSignal,
    grace: Duration,
) {
    if signal.is_triggered() {
        return;
    }

    registry.begin_shutdown();
    tracing::info!(grace_ms = grace.as_millis() as u64, "Initiating graceful shutdown");

    tokio::time::sleep(grace).await;
    signal.trigger();
}
