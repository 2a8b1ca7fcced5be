//! Messages exchanged with viewers
//!
//! Outbound messages are grouped into a [`Push`]: one shared, ordered batch
//! that is queued to every subscriber of a broadcast. Cloning a push only
//! bumps a reference count.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::state::SessionSummary;
use crate::timeline::{Delta, SubtitleLine};

/// Message pushed to a viewer connection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Available tracks of the session
    Tracks {
        tracks: Vec<String>,
        #[serde(rename = "currentTrack")]
        current_track: String,
        #[serde(rename = "videoTitle")]
        video_title: String,
    },
    /// Full visible prefix; replaces whatever the viewer displays
    SubtitlesInit { lines: Vec<SubtitleLine> },
    /// One newly visible entry
    SubtitleAdd { subtitle: SubtitleLine },
    /// Drop `count` entries from the end of the displayed list
    SubtitleRemove { count: usize },
    /// Snapshot of all sessions (global subscribers only)
    SessionsList { sessions: Vec<SessionSummary> },
    /// The session is gone; the connection closes next
    SessionClosed,
}

/// Message sent by a viewer
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "selectTrack")]
    SelectTrack { track: String },
}

/// Ordered batch of messages delivered to a subscriber as one unit
#[derive(Debug, Clone, PartialEq)]
pub struct Push(Arc<[ServerMessage]>);

impl Push {
    pub fn single(message: ServerMessage) -> Self {
        Self(Arc::from(vec![message]))
    }

    pub fn batch(messages: Vec<ServerMessage>) -> Self {
        Self(Arc::from(messages))
    }

    /// Wire form of a delta: one `subtitle_add` per appended entry, or a
    /// single `subtitle_remove`. `None` for [`Delta::NoChange`].
    pub fn from_delta(delta: &Delta) -> Option<Self> {
        match delta {
            Delta::NoChange => None,
            Delta::Append(lines) => Some(Self::batch(
                lines
                    .iter()
                    .map(|line| ServerMessage::SubtitleAdd {
                        subtitle: line.clone(),
                    })
                    .collect(),
            )),
            Delta::Retract(count) => Some(Self::single(ServerMessage::SubtitleRemove {
                count: *count,
            })),
        }
    }

    pub fn messages(&self) -> &[ServerMessage] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
