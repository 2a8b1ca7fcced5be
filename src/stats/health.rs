//! Health and introspection report

use serde::Serialize;

/// Liveness snapshot for external supervisors
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// `"ok"` or `"shutting_down"`
    pub status: &'static str,
    /// Number of live sessions
    pub active_sessions: usize,
    /// Subscribers across all sessions plus global subscribers
    pub total_subscribers: usize,
    /// Subscribers to the session list
    pub global_subscribers: usize,
    /// Whether the registry has stopped accepting new work
    pub shutting_down: bool,
}

impl HealthReport {
    pub fn new(
        active_sessions: usize,
        total_subscribers: usize,
        global_subscribers: usize,
        shutting_down: bool,
    ) -> Self {
        Self {
            status: if shutting_down { "shutting_down" } else { "ok" },
            active_sessions,
            total_subscribers,
            global_subscribers,
            shutting_down,
        }
    }

    pub fn is_ok(&self) -> bool {
        !self.shutting_down
    }
}
