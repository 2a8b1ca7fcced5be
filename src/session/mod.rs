//! Playback sessions and their viewers
//!
//! A [`Session`] owns one player's subtitle tracks, its playback cursor and
//! the [`SubscriberSet`] of viewers watching it. Everything pushed to a
//! viewer goes through the set as a [`Push`].

pub mod id;
pub mod message;
pub mod state;
pub mod subscriber;

pub use id::{SessionId, SubscriberId};
pub use message::{ClientMessage, Push, ServerMessage};
pub use state::{InitReport, Session, SessionSummary};
pub use subscriber::{BroadcastOutcome, SendError, Subscriber, SubscriberSet};
