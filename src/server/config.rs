//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::registry::RegistryConfig;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// WebSocket ping interval
    pub heartbeat_interval: Duration,

    /// Session registry and lifecycle settings
    pub registry: RegistryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8765)),
            heartbeat_interval: Duration::from_secs(30),
            registry: RegistryConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Defaults overlaid with `SUBSYNC_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`
    ///
    /// Recognized keys: `SUBSYNC_BIND`, `SUBSYNC_STALE_TIMEOUT_SECS`,
    /// `SUBSYNC_IDLE_TIMEOUT_SECS`, `SUBSYNC_MAX_SUBSCRIBERS`. Values that do
    /// not parse are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parse_var(&lookup, "SUBSYNC_BIND") {
            config.bind_addr = addr;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "SUBSYNC_STALE_TIMEOUT_SECS") {
            config.registry.stale_session_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "SUBSYNC_IDLE_TIMEOUT_SECS") {
            config.registry.idle_shutdown_timeout = Duration::from_secs(secs);
        }
        if let Some(max) = parse_var(&lookup, "SUBSYNC_MAX_SUBSCRIBERS") {
            config.registry.max_subscribers = max;
        }

        config
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the WebSocket heartbeat interval
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the registry configuration
    pub fn registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key = key, value = %raw, error = %e, "Ignoring invalid setting");
            None
        }
    }
}
