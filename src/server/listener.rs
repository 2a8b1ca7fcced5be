//! HTTP/WebSocket server
//!
//! Binds the listener, runs the lifecycle timers next to the router and
//! drives the shutdown sequence.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use super::config::ServerConfig;
use super::routes::{router, AppState};
use crate::error::Result;
use crate::lifecycle::{LifecycleMonitor, ShutdownSignal};
use crate::registry::SessionRegistry;

/// Subtitle sync server
pub struct SyncServer {
    config: ServerConfig,
    registry: Arc<SessionRegistry>,
    shutdown: ShutdownSignal,
}

impl SyncServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(SessionRegistry::with_config(config.registry.clone()));
        Self::with_registry(config, registry)
    }

    /// Create a server around an existing registry
    pub fn with_registry(config: ServerConfig, registry: Arc<SessionRegistry>) -> Self {
        Self {
            config,
            registry,
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Get a reference to the session registry
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Signal that stops [`run`](Self::run) when triggered
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run the server
    ///
    /// Returns once the shutdown signal fires (idle timeout or
    /// `POST /shutdown`) and teardown has completed.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    ///
    /// `external` (typically Ctrl-C) stops the server like the internal
    /// shutdown signal does.
    pub async fn run_until<F>(&self, external: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Subtitle sync server listening");
        self.serve(listener, external).await
    }

    /// Serve on an already bound listener
    pub async fn serve<F>(&self, listener: TcpListener, external: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let monitor = LifecycleMonitor::spawn(Arc::clone(&self.registry), self.shutdown.clone());

        let app = router(AppState {
            registry: Arc::clone(&self.registry),
            shutdown: self.shutdown.clone(),
            heartbeat_interval: self.config.heartbeat_interval,
        });

        let registry = Arc::clone(&self.registry);
        let signal = self.shutdown.clone();

        // Teardown runs inside the graceful-shutdown future so open sockets
        // see their queues close and finish before serve waits on them.
        let sequence = async move {
            tokio::select! {
                _ = signal.wait() => tracing::info!("Shutdown signal received"),
                _ = external => tracing::info!("External shutdown requested"),
            }

            registry.begin_shutdown();
            monitor.stop().await;
            registry.teardown().await;
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(sequence)
            .await?;

        self.shutdown.trigger();
        tracing::info!("Server stopped");
        Ok(())
    }
}
