//! # subsync
//!
//! Session-scoped subtitle synchronization server.
//!
//! A media player reports its playback position; remote viewers see the
//! subtitles spoken so far. Each player instance gets its own session, and
//! every position update is turned into the smallest change to what viewers
//! display: new lines appended while playing, lines retracted on a seek back.
//!
//! ## Example
//!
//! ```no_run
//! use subsync::{ServerConfig, SyncServer};
//!
//! #[tokio::main]
//! async fn main() -> subsync::Result<()> {
//!     let server = SyncServer::new(ServerConfig::default());
//!     server.run().await
//! }
//! ```
//!
//! ## Using the registry directly
//!
//! ```
//! use subsync::registry::{Scope, SessionRegistry};
//!
//! # tokio_test::block_on(async {
//! let registry = SessionRegistry::new();
//! let id = registry.create_session().await?;
//! registry
//!     .init_session(&id, "Movie", vec![(
//!         "en.srt".to_string(),
//!         "1\n00:00:01,000 --> 00:00:02,000\nHello\n".to_string(),
//!     )])
//!     .await?;
//!
//! let mut viewer = registry.connect(Scope::Session(id.clone())).await?;
//! let delta = registry.update_position(&id, 1500).await?;
//! assert!(!delta.is_no_change());
//! # let _ = viewer.receiver.try_recv();
//! # Ok::<(), subsync::Error>(())
//! # });
//! ```

pub mod error;
pub mod lifecycle;
pub mod parser;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;
pub mod timeline;

pub use error::{Error, Result};
pub use lifecycle::{LifecycleMonitor, ShutdownSignal};
pub use parser::{SrtParser, SubtitleParser};
pub use registry::{RegistryConfig, SessionRegistry};
pub use server::{ServerConfig, SyncServer};
pub use session::{ServerMessage, SessionId};
pub use timeline::{Delta, SubtitleEntry, Track};
