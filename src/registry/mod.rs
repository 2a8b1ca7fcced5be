//! Session registry
//!
//! The registry owns every live session and routes transport events to
//! them. Viewers subscribe either to one session or to the global session
//! list; each subscriber gets its own bounded queue.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<SessionRegistry>
//!                  ┌──────────────────────────────┐
//!                  │ sessions: RwLock<HashMap<Id, │
//!                  │   Mutex<Session {            │
//!                  │     tracks, cursor,          │
//!                  │     subscribers,             │
//!                  │   }>                         │
//!                  │ >                            │
//!                  │ global: Mutex<SubscriberSet> │
//!                  └──────────────┬───────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!      [Player]               [Viewer]                [Viewer]
//!   update_position()      receiver.recv()         receiver.recv()
//!         │                       │                       │
//!         └──► delta ──► SubscriberSet::broadcast() ──► WebSocket
//! ```
//!
//! # Lifecycle
//!
//! Sessions are created on request and removed by explicit deletion, by the
//! stale sweep, or by [`SessionRegistry::teardown`] at shutdown. In every
//! case their subscribers receive `session_closed` and are disconnected.

pub mod config;
pub mod connection;
pub mod store;

pub use config::RegistryConfig;
pub use connection::{Connection, Scope};
pub use store::SessionRegistry;
