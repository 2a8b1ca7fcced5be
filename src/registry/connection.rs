//! Connection handles given to the transport layer

use tokio::sync::mpsc;

use crate::session::{Push, SessionId, SubscriberId};

/// What a connection subscribes to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Session list updates
    Global,
    /// One session's subtitle updates
    Session(SessionId),
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Global => f.write_str("global"),
            Scope::Session(id) => write!(f, "session/{}", id),
        }
    }
}

/// A registered subscriber connection
///
/// The transport drains `receiver` and writes each push to the wire. When the
/// registry drops the subscriber (disconnect, session deletion, shutdown) the
/// receiver yields `None` and the transport should close the connection.
#[derive(Debug)]
pub struct Connection {
    pub id: SubscriberId,
    pub scope: Scope,
    pub receiver: mpsc::Receiver<Push>,
}
