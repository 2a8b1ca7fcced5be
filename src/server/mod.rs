//! HTTP and WebSocket server
//!
//! Player-facing control endpoints and viewer sockets on top of the
//! [`SessionRegistry`](crate::registry::SessionRegistry).

pub mod config;
pub mod listener;
pub mod routes;
pub mod ws;

pub use config::ServerConfig;
pub use listener::SyncServer;
pub use routes::{router, AppState};
