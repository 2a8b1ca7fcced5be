//! Background lifecycle management
//!
//! Two timers run next to the server:
//!
//! - the **stale sweep** evicts sessions nobody has touched for
//!   `stale_session_timeout`;
//! - the **idle watch** shuts the process down once the registry has had no
//!   sessions for `idle_shutdown_timeout`.
//!
//! Shutdown goes through [`initiate_shutdown`]: the registry stops
//! accepting new work, a short grace period lets in-flight responses finish,
//! then the [`ShutdownSignal`] fires and the server tears everything down.

pub mod monitor;
pub mod shutdown;

pub use monitor::LifecycleMonitor;
pub use shutdown::{initiate_shutdown, ShutdownSignal};
