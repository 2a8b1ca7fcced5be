//! Error types
//!
//! Every error here is a declined operation. None of them is fatal to the
//! process; the only deliberate exit path is the lifecycle shutdown.

use crate::session::SessionId;

/// Error type for session and registry operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No session with this id
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// The session has no track with this name
    #[error("track not found: {0}")]
    TrackNotFound(String),

    /// A subscriber set is full; existing subscribers are unaffected
    #[error("subscriber limit reached ({limit})")]
    CapacityExceeded { limit: usize },

    /// The registry no longer accepts new work
    #[error("server is shutting down")]
    ShuttingDown,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error means an id or name was unknown
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::SessionNotFound(_) | Error::TrackNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
