//! Per-session playback state
//!
//! A session tracks one media player instance: its subtitle tracks, the
//! current playback position and the viewers watching it. The cursor
//! `(current_track, position_ms, visible_count)` satisfies
//!
//! ```text
//! visible_count == visible_count(tracks[current_track], position_ms)
//! ```
//!
//! after every operation and before anything is broadcast. Position updates
//! move the cursor incrementally and broadcast a delta; loading tracks or
//! switching tracks recomputes it and pushes a full re-sync.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tokio::time::Instant;

use super::id::{SessionId, SubscriberId};
use super::message::{Push, ServerMessage};
use super::subscriber::{BroadcastOutcome, Subscriber, SubscriberSet};
use crate::error::{Error, Result};
use crate::timeline::{compute_delta, visible_count, Delta, Track};

/// Listing entry for one session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub video_title: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub subscriber_count: usize,
    pub current_track: Option<String>,
    pub tracks_loaded: usize,
    pub position_ms: u64,
}

/// Outcome of loading a session's tracks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitReport {
    /// Names of the tracks that parsed, in input order
    pub tracks: Vec<String>,
    /// Entry count per parsed track
    #[serde(serialize_with = "ordered_map")]
    pub entries_count: Vec<(String, usize)>,
}

fn ordered_map<S: Serializer>(
    pairs: &[(String, usize)],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_map(pairs.iter().map(|(k, v)| (k, v)))
}

/// Live state of one playback session
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    video_title: String,
    tracks: Vec<Track>,
    /// Index into `tracks`
    current_track: Option<usize>,
    position_ms: u64,
    visible_count: usize,
    created_at: DateTime<Utc>,
    last_activity: Instant,
    last_activity_at: DateTime<Utc>,
    subscribers: SubscriberSet,
    /// Set once the session has been removed from the registry
    closed: bool,
}

impl Session {
    /// Create an empty session accepting at most `max_subscribers` viewers
    pub fn new(id: SessionId, max_subscribers: usize) -> Self {
        let now = Utc::now();
        Self {
            id,
            video_title: String::new(),
            tracks: Vec::new(),
            current_track: None,
            position_ms: 0,
            visible_count: 0,
            created_at: now,
            last_activity: Instant::now(),
            last_activity_at: now,
            subscribers: SubscriberSet::new(max_subscribers),
            closed: false,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn video_title(&self) -> &str {
        &self.video_title
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_track.and_then(|i| self.tracks.get(i))
    }

    pub fn current_track_name(&self) -> Option<&str> {
        self.current_track().map(Track::name)
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    pub fn visible_count(&self) -> usize {
        self.visible_count
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// Time since the session was last touched
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    /// Record activity
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
        self.last_activity_at = Utc::now();
    }

    /// Load the session's tracks, replacing any previous ones
    ///
    /// The first track becomes current and playback restarts at 0. Every
    /// subscriber receives the new track list and a full re-sync.
    pub fn init(&mut self, video_title: impl Into<String>, tracks: Vec<Track>) -> InitReport {
        self.video_title = video_title.into();
        self.tracks = tracks;
        self.current_track = if self.tracks.is_empty() {
            tracing::warn!(session = %self.id, "No subtitle tracks loaded");
            None
        } else {
            Some(0)
        };
        self.position_ms = 0;
        self.visible_count = self.recount();
        self.touch();

        let report = InitReport {
            tracks: self.tracks.iter().map(|t| t.name().to_string()).collect(),
            entries_count: self
                .tracks
                .iter()
                .map(|t| (t.name().to_string(), t.len()))
                .collect(),
        };

        tracing::info!(
            session = %self.id,
            title = %self.video_title,
            tracks = self.tracks.len(),
            current_track = ?self.current_track_name(),
            "Session initialized"
        );

        let push = self.resync_push();
        self.broadcast(&push);
        report
    }

    /// Move playback to `position_ms` and broadcast the resulting delta
    pub fn update_position(&mut self, position_ms: u64) -> Delta {
        self.touch();
        self.position_ms = position_ms;

        let Some(track) = self.current_track() else {
            return Delta::NoChange;
        };

        let new_count = visible_count(track.entries(), position_ms);
        if new_count == self.visible_count {
            return Delta::NoChange;
        }

        let delta = compute_delta(self.visible_count, new_count, track.entries());
        self.visible_count = new_count;

        tracing::debug!(
            session = %self.id,
            position_ms = position_ms,
            visible = new_count,
            delta = ?delta,
            "Visible subtitles changed"
        );

        if let Some(push) = Push::from_delta(&delta) {
            self.broadcast(&push);
        }
        delta
    }

    /// Switch the current track and re-sync every subscriber
    ///
    /// Unknown names are declined without touching the cursor.
    pub fn select_track(&mut self, name: &str) -> Result<()> {
        let Some(index) = self.tracks.iter().position(|t| t.name() == name) else {
            tracing::warn!(session = %self.id, track = %name, "Invalid track selection");
            return Err(Error::TrackNotFound(name.to_string()));
        };

        self.touch();
        self.current_track = Some(index);
        self.visible_count = self.recount();

        tracing::info!(
            session = %self.id,
            track = %name,
            visible = self.visible_count,
            "Switched track"
        );

        let push = self.resync_push();
        self.broadcast(&push);
        Ok(())
    }

    /// Register a viewer and queue its initial state
    ///
    /// A closed session declines with [`Error::SessionNotFound`].
    pub fn subscribe(&mut self, subscriber: Subscriber) -> Result<()> {
        if self.closed {
            return Err(Error::SessionNotFound(self.id.clone()));
        }
        let id = subscriber.id();
        self.subscribers.insert(subscriber)?;
        let push = self.resync_push();
        self.subscribers.send_to(id, push);

        tracing::info!(
            session = %self.id,
            subscriber = %id,
            subscribers = self.subscribers.len(),
            "Subscriber added"
        );
        Ok(())
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let removed = self.subscribers.remove(id);
        if removed {
            tracing::info!(
                session = %self.id,
                subscriber = %id,
                subscribers = self.subscribers.len(),
                "Subscriber removed"
            );
        }
        removed
    }

    /// Tell every subscriber the session is gone and drop them
    pub fn close(&mut self) -> usize {
        self.closed = true;
        self.subscribers
            .close_all(Some(Push::single(ServerMessage::SessionClosed)))
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            video_title: self.video_title.clone(),
            created_at: self.created_at,
            last_activity: self.last_activity_at,
            subscriber_count: self.subscribers.len(),
            current_track: self.current_track_name().map(str::to_string),
            tracks_loaded: self.tracks.len(),
            position_ms: self.position_ms,
        }
    }

    fn recount(&self) -> usize {
        self.current_track()
            .map(|t| visible_count(t.entries(), self.position_ms))
            .unwrap_or(0)
    }

    fn tracks_message(&self) -> ServerMessage {
        ServerMessage::Tracks {
            tracks: self.tracks.iter().map(|t| t.name().to_string()).collect(),
            current_track: self.current_track_name().unwrap_or_default().to_string(),
            video_title: self.video_title.clone(),
        }
    }

    fn init_message(&self) -> ServerMessage {
        let lines = self
            .current_track()
            .map(|t| t.prefix_lines(self.visible_count))
            .unwrap_or_default();
        ServerMessage::SubtitlesInit { lines }
    }

    /// Track list followed by the full visible prefix
    fn resync_push(&self) -> Push {
        Push::batch(vec![self.tracks_message(), self.init_message()])
    }

    fn broadcast(&mut self, push: &Push) -> BroadcastOutcome {
        let outcome = self.subscribers.broadcast(push);
        if !outcome.pruned.is_empty() {
            tracing::warn!(
                session = %self.id,
                pruned = outcome.pruned.len(),
                remaining = self.subscribers.len(),
                "Pruned unreachable subscribers"
            );
        }
        outcome
    }
}
