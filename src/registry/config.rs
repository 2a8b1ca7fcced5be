//! Registry configuration

use std::time::Duration;

/// Session registry and lifecycle configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Evict sessions untouched for longer than this
    pub stale_session_timeout: Duration,

    /// How often the stale-session sweep runs
    pub sweep_interval: Duration,

    /// Shut down after having no sessions for longer than this
    pub idle_shutdown_timeout: Duration,

    /// How often the global idle check runs (shorter than the sweep)
    pub idle_check_interval: Duration,

    /// Delay between deciding to shut down and signalling exit
    pub shutdown_grace: Duration,

    /// Maximum subscribers per session, and for the global set (0 = unlimited)
    pub max_subscribers: usize,

    /// Pushes a subscriber may have queued before it counts as unreachable
    pub subscriber_queue_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            stale_session_timeout: Duration::from_secs(60 * 60),
            sweep_interval: Duration::from_secs(60),
            idle_shutdown_timeout: Duration::from_secs(5 * 60),
            idle_check_interval: Duration::from_secs(10),
            shutdown_grace: Duration::from_millis(500),
            max_subscribers: 100,
            subscriber_queue_capacity: 256,
        }
    }
}

impl RegistryConfig {
    /// Set the stale session timeout
    pub fn stale_session_timeout(mut self, timeout: Duration) -> Self {
        self.stale_session_timeout = timeout;
        self
    }

    /// Set the stale sweep interval
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the global idle shutdown timeout
    pub fn idle_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.idle_shutdown_timeout = timeout;
        self
    }

    /// Set the global idle check interval
    pub fn idle_check_interval(mut self, interval: Duration) -> Self {
        self.idle_check_interval = interval;
        self
    }

    /// Set the shutdown grace period
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Set maximum subscribers per set
    pub fn max_subscribers(mut self, max: usize) -> Self {
        self.max_subscribers = max;
        self
    }

    /// Set per-subscriber queue capacity (at least 1)
    pub fn subscriber_queue_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_queue_capacity = capacity.max(1);
        self
    }
}
