//! Session registry implementation
//!
//! The central registry that owns every session and the global subscriber
//! set, and routes transport events to the right session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use super::config::RegistryConfig;
use super::connection::{Connection, Scope};
use crate::error::{Error, Result};
use crate::parser::{parse_tracks, SrtParser, SubtitleParser};
use crate::session::{
    ClientMessage, InitReport, Push, ServerMessage, Session, SessionId, SessionSummary,
    Subscriber, SubscriberId, SubscriberSet,
};
use crate::stats::HealthReport;
use crate::timeline::Delta;

/// Session map plus the time it last became empty
struct SessionMap {
    entries: HashMap<SessionId, Arc<Mutex<Session>>>,
    last_empty_at: Instant,
}

/// Central registry for all live sessions
///
/// The map has its own `RwLock`; each session has its own `Mutex`, so work on
/// different sessions proceeds in parallel while operations on one session
/// are serialized. The map lock may be held while taking a session lock,
/// never the other way round.
pub struct SessionRegistry {
    sessions: RwLock<SessionMap>,

    /// Subscribers to session-list updates
    global: Mutex<SubscriberSet>,

    parser: Arc<dyn SubtitleParser>,
    next_subscriber_id: AtomicU64,
    shutting_down: AtomicBool,
    config: RegistryConfig,
}

impl SessionRegistry {
    /// Create a registry with default configuration and the SRT parser
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with custom configuration and the SRT parser
    pub fn with_config(config: RegistryConfig) -> Self {
        Self::with_parser(config, Arc::new(SrtParser::new()))
    }

    /// Create a registry with a custom parser
    pub fn with_parser(config: RegistryConfig, parser: Arc<dyn SubtitleParser>) -> Self {
        Self {
            sessions: RwLock::new(SessionMap {
                entries: HashMap::new(),
                last_empty_at: Instant::now(),
            }),
            global: Mutex::new(SubscriberSet::new(config.max_subscribers)),
            parser,
            next_subscriber_id: AtomicU64::new(1),
            shutting_down: AtomicBool::new(false),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Create an empty session
    pub async fn create_session(&self) -> Result<SessionId> {
        if self.is_shutting_down() {
            return Err(Error::ShuttingDown);
        }

        let id = SessionId::generate();
        let session = Session::new(id.clone(), self.config.max_subscribers);

        let total = {
            let mut sessions = self.sessions.write().await;
            sessions
                .entries
                .insert(id.clone(), Arc::new(Mutex::new(session)));
            sessions.entries.len()
        };

        tracing::info!(session = %id, sessions = total, "Session created");

        self.broadcast_sessions_list().await;
        Ok(id)
    }

    /// Look up a session
    pub async fn get(&self, id: &SessionId) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.entries.get(id).cloned()
    }

    async fn session(&self, id: &SessionId) -> Result<Arc<Mutex<Session>>> {
        self.get(id)
            .await
            .ok_or_else(|| Error::SessionNotFound(id.clone()))
    }

    /// Parse and load a session's tracks
    ///
    /// Tracks that fail to parse are left out; the session may end up with
    /// none. Parsing happens before the session lock is taken.
    pub async fn init_session(
        &self,
        id: &SessionId,
        video_title: impl Into<String>,
        raw_tracks: Vec<(String, String)>,
    ) -> Result<InitReport> {
        let session = self.session(id).await?;
        let tracks = parse_tracks(self.parser.as_ref(), raw_tracks);

        let report = session.lock().await.init(video_title, tracks);

        self.broadcast_sessions_list().await;
        Ok(report)
    }

    /// Update a session's playback position
    pub async fn update_position(&self, id: &SessionId, position_ms: u64) -> Result<Delta> {
        let session = self.session(id).await?;
        let delta = session.lock().await.update_position(position_ms);
        Ok(delta)
    }

    /// Switch a session's current track
    pub async fn select_track(&self, id: &SessionId, track: &str) -> Result<()> {
        let session = self.session(id).await?;
        let result = session.lock().await.select_track(track);
        result
    }

    /// Delete a session, notifying and disconnecting its subscribers
    ///
    /// Returns `false` if there was no such session.
    pub async fn delete_session(&self, id: &SessionId) -> bool {
        let Some(session) = self.take_session(id, None).await else {
            return false;
        };

        let closed = session.lock().await.close();
        tracing::info!(session = %id, closed_subscribers = closed, "Session deleted");

        self.broadcast_sessions_list().await;
        true
    }

    /// Remove a session from the map, optionally only if it has been idle
    /// for longer than `stale` at `now`
    async fn take_session(
        &self,
        id: &SessionId,
        stale: Option<(Instant, Duration)>,
    ) -> Option<Arc<Mutex<Session>>> {
        let mut sessions = self.sessions.write().await;

        if let Some((now, timeout)) = stale {
            let entry = sessions.entries.get(id)?;
            // A locked session is in use, hence not stale
            let idle = entry.try_lock().ok()?.idle_for(now);
            if idle <= timeout {
                return None;
            }
        }

        let removed = sessions.entries.remove(id)?;
        if sessions.entries.is_empty() {
            sessions.last_empty_at = Instant::now();
        }
        Some(removed)
    }

    /// Delete every session untouched for longer than the stale timeout
    pub async fn evict_stale(&self) -> Vec<SessionId> {
        let now = Instant::now();
        let timeout = self.config.stale_session_timeout;

        let candidates: Vec<SessionId> = {
            let sessions = self.sessions.read().await;
            sessions
                .entries
                .iter()
                .filter_map(|(id, entry)| {
                    let session = entry.try_lock().ok()?;
                    (session.idle_for(now) > timeout).then(|| id.clone())
                })
                .collect()
        };

        let mut evicted = Vec::with_capacity(candidates.len());
        for id in candidates {
            let Some(session) = self.take_session(&id, Some((now, timeout))).await else {
                continue;
            };

            let mut session = session.lock().await;
            let idle = session.idle_for(now);
            let closed = session.close();
            drop(session);

            tracing::info!(
                session = %id,
                idle_secs = idle.as_secs(),
                closed_subscribers = closed,
                "Stale session evicted"
            );
            evicted.push(id);
        }

        if !evicted.is_empty() {
            self.broadcast_sessions_list().await;
        }
        evicted
    }

    /// How long the registry has had no sessions, if it has none
    pub async fn idle_elapsed(&self, now: Instant) -> Option<Duration> {
        let sessions = self.sessions.read().await;
        if sessions.entries.is_empty() {
            Some(now.saturating_duration_since(sessions.last_empty_at))
        } else {
            None
        }
    }

    /// Snapshot of all sessions, oldest first
    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        let entries: Vec<Arc<Mutex<Session>>> =
            self.sessions.read().await.entries.values().cloned().collect();

        let mut summaries = Vec::with_capacity(entries.len());
        for entry in entries {
            summaries.push(entry.lock().await.summary());
        }
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        summaries
    }

    /// Get total number of sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.entries.len()
    }

    /// Register a subscriber connection
    ///
    /// The connection's queue already holds its initial state: the track
    /// list and visible prefix for a session, or the session list for the
    /// global scope.
    pub async fn connect(&self, scope: Scope) -> Result<Connection> {
        if self.is_shutting_down() {
            return Err(Error::ShuttingDown);
        }

        let id = SubscriberId(self.next_subscriber_id.fetch_add(1, Ordering::Relaxed));
        let (subscriber, receiver) =
            Subscriber::channel(id, self.config.subscriber_queue_capacity);

        match &scope {
            Scope::Global => {
                // Snapshot under the global lock so no list broadcast can
                // slip between the snapshot and the insert
                let mut global = self.global.lock().await;
                let sessions = self.list_sessions().await;
                if let Err(e) = global.insert(subscriber) {
                    tracing::warn!(subscriber = %id, "Global subscriber rejected: limit reached");
                    return Err(e);
                }
                global.send_to(id, Push::single(ServerMessage::SessionsList { sessions }));
                tracing::info!(
                    subscriber = %id,
                    subscribers = global.len(),
                    "Global subscriber added"
                );
            }
            Scope::Session(session_id) => {
                let session = self.session(session_id).await?;
                let mut session = session.lock().await;
                if let Err(e) = session.subscribe(subscriber) {
                    tracing::warn!(
                        session = %session_id,
                        subscriber = %id,
                        error = %e,
                        "Subscriber rejected"
                    );
                    return Err(e);
                }
            }
        }

        Ok(Connection {
            id,
            scope,
            receiver,
        })
    }

    /// Remove a subscriber connection
    pub async fn disconnect(&self, scope: &Scope, id: SubscriberId) {
        match scope {
            Scope::Global => {
                let mut global = self.global.lock().await;
                if global.remove(id) {
                    tracing::info!(
                        subscriber = %id,
                        subscribers = global.len(),
                        "Global subscriber removed"
                    );
                }
            }
            Scope::Session(session_id) => {
                if let Some(session) = self.get(session_id).await {
                    session.lock().await.unsubscribe(id);
                }
            }
        }
    }

    /// Handle a message sent by a subscriber connection
    pub async fn handle_client_message(&self, scope: &Scope, message: ClientMessage) -> Result<()> {
        match (scope, message) {
            (Scope::Session(id), ClientMessage::SelectTrack { track }) => {
                self.select_track(id, &track).await
            }
            (Scope::Global, message) => {
                tracing::warn!(message = ?message, "Ignoring session message on global connection");
                Ok(())
            }
        }
    }

    /// Push the current session list to every global subscriber
    pub async fn broadcast_sessions_list(&self) {
        let sessions = self.list_sessions().await;
        let push = Push::single(ServerMessage::SessionsList { sessions });

        let mut global = self.global.lock().await;
        if global.is_empty() {
            return;
        }
        let outcome = global.broadcast(&push);
        if !outcome.pruned.is_empty() {
            tracing::warn!(
                pruned = outcome.pruned.len(),
                remaining = global.len(),
                "Pruned unreachable global subscribers"
            );
        }
    }

    /// Liveness and load figures
    pub async fn health(&self) -> HealthReport {
        let entries: Vec<Arc<Mutex<Session>>> =
            self.sessions.read().await.entries.values().cloned().collect();

        let mut session_subscribers = 0;
        for entry in &entries {
            session_subscribers += entry.lock().await.subscriber_count();
        }
        let global_subscribers = self.global.lock().await.len();

        HealthReport::new(
            entries.len(),
            session_subscribers + global_subscribers,
            global_subscribers,
            self.is_shutting_down(),
        )
    }

    /// Stop accepting new sessions and connections
    pub fn begin_shutdown(&self) {
        if !self.shutting_down.swap(true, Ordering::SeqCst) {
            tracing::info!("Registry no longer accepting new work");
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Close every connection and drop every session
    ///
    /// Session subscribers get a `session_closed` notice first; global
    /// subscribers are then disconnected.
    pub async fn teardown(&self) {
        self.begin_shutdown();

        let drained: Vec<(SessionId, Arc<Mutex<Session>>)> = {
            let mut sessions = self.sessions.write().await;
            sessions.last_empty_at = Instant::now();
            sessions.entries.drain().collect()
        };

        let mut closed = 0;
        for (_, session) in &drained {
            closed += session.lock().await.close();
        }

        let global_closed = self.global.lock().await.close_all(None);

        tracing::info!(
            sessions = drained.len(),
            session_subscribers = closed,
            global_subscribers = global_closed,
            "Registry torn down"
        );
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use tokio_test::assert_ok;

    use super::*;
    use crate::parser::ParseError;
    use crate::timeline::{SubtitleEntry, SubtitleLine};

    const SRT: &str = "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n\
                       2\n00:00:03,000 --> 00:00:04,000\nWorld\n\n\
                       3\n00:00:05,000 --> 00:00:06,000\n!\n";

    fn drain(rx: &mut mpsc::Receiver<Push>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(push) = rx.try_recv() {
            out.extend(push.messages().iter().cloned());
        }
        out
    }

    fn last_session_list(messages: &[ServerMessage]) -> Option<Vec<SessionSummary>> {
        messages.iter().rev().find_map(|m| match m {
            ServerMessage::SessionsList { sessions } => Some(sessions.clone()),
            _ => None,
        })
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let registry = SessionRegistry::new();

        let a = registry.create_session().await.unwrap();
        let b = registry.create_session().await.unwrap();

        assert_ne!(a, b);
        assert!(registry.get(&a).await.is_some());
        assert_eq!(registry.session_count().await, 2);
        assert!(registry.get(&SessionId::from("missing")).await.is_none());
    }

    #[tokio::test]
    async fn test_init_reports_tracks_and_skips_bad_ones() {
        let registry = SessionRegistry::new();
        let id = registry.create_session().await.unwrap();

        let report = registry
            .init_session(
                &id,
                "Movie",
                vec![
                    ("en.srt".into(), SRT.into()),
                    ("broken.srt".into(), "not subtitles".into()),
                ],
            )
            .await
            .unwrap();

        assert_eq!(report.tracks, vec!["en.srt"]);
        assert_eq!(report.entries_count, vec![("en.srt".to_string(), 3)]);
    }

    #[tokio::test]
    async fn test_init_merges_repeated_track_names() {
        let registry = SessionRegistry::new();
        let id = registry.create_session().await.unwrap();
        let old = "1\n00:00:00,000 --> 00:00:01,000\nOld\n";
        let new = "1\n00:00:00,000 --> 00:00:01,000\nNew\n";

        let report = registry
            .init_session(
                &id,
                "Movie",
                vec![("en.srt".into(), old.into()), ("en.srt".into(), new.into())],
            )
            .await
            .unwrap();

        assert_eq!(report.tracks, vec!["en.srt"]);
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"tracks":["en.srt"],"entries_count":{"en.srt":1}}"#
        );

        let session = registry.get(&id).await.unwrap();
        let session = session.lock().await;
        assert_eq!(session.tracks().len(), 1);
        assert_eq!(session.current_track().unwrap().entries()[0].text, "New");
    }

    #[tokio::test]
    async fn test_connect_to_closed_session_is_refused() {
        let registry = SessionRegistry::new();
        let id = registry.create_session().await.unwrap();

        // A handle fetched before deletion still points at the old session
        let stale = registry.get(&id).await.unwrap();
        assert!(registry.delete_session(&id).await);

        let (subscriber, _rx) = Subscriber::channel(SubscriberId(99), 4);
        assert!(matches!(
            stale.lock().await.subscribe(subscriber),
            Err(Error::SessionNotFound(_))
        ));
        assert!(matches!(
            registry.connect(Scope::Session(id)).await,
            Err(Error::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_global_snapshot_includes_concurrent_creates() {
        let registry = Arc::new(SessionRegistry::new());

        let creator = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                for _ in 0..20 {
                    registry.create_session().await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut global = registry.connect(Scope::Global).await.unwrap();
        creator.await.unwrap();

        let list = last_session_list(&drain(&mut global.receiver)).unwrap();
        assert_eq!(list.len(), 20);
    }

    #[tokio::test]
    async fn test_unknown_session_operations() {
        let registry = SessionRegistry::new();
        let missing = SessionId::from("missing");

        assert!(matches!(
            registry.update_position(&missing, 10).await,
            Err(Error::SessionNotFound(_))
        ));
        assert!(matches!(
            registry.select_track(&missing, "en").await,
            Err(Error::SessionNotFound(_))
        ));
        assert!(matches!(
            registry.init_session(&missing, "x", vec![]).await,
            Err(Error::SessionNotFound(_))
        ));
        assert!(matches!(
            registry.connect(Scope::Session(missing.clone())).await,
            Err(Error::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_position_updates_flow_to_viewers() {
        let registry = SessionRegistry::new();
        let id = registry.create_session().await.unwrap();
        registry
            .init_session(&id, "Movie", vec![("en.srt".into(), SRT.into())])
            .await
            .unwrap();

        let mut conn = registry.connect(Scope::Session(id.clone())).await.unwrap();
        assert_eq!(drain(&mut conn.receiver).len(), 2);

        assert_ok!(registry.update_position(&id, 3500).await);
        assert_eq!(
            registry.update_position(&id, 3600).await.unwrap(),
            Delta::NoChange
        );
        assert_eq!(
            registry.update_position(&id, 0).await.unwrap(),
            Delta::Retract(2)
        );

        assert_eq!(
            drain(&mut conn.receiver),
            vec![
                ServerMessage::SubtitleAdd {
                    subtitle: SubtitleLine {
                        text: "Hello".into(),
                        start_ms: 1000
                    }
                },
                ServerMessage::SubtitleAdd {
                    subtitle: SubtitleLine {
                        text: "World".into(),
                        start_ms: 3000
                    }
                },
                ServerMessage::SubtitleRemove { count: 2 },
            ]
        );
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let registry = SessionRegistry::new();
        let a = registry.create_session().await.unwrap();
        let b = registry.create_session().await.unwrap();
        for id in [&a, &b] {
            registry
                .init_session(id, "Movie", vec![("en.srt".into(), SRT.into())])
                .await
                .unwrap();
        }

        let mut conn_a = registry.connect(Scope::Session(a.clone())).await.unwrap();
        let mut conn_b = registry.connect(Scope::Session(b.clone())).await.unwrap();
        drain(&mut conn_a.receiver);
        drain(&mut conn_b.receiver);

        registry.update_position(&a, 10_000).await.unwrap();

        assert_eq!(drain(&mut conn_a.receiver).len(), 3);
        assert!(drain(&mut conn_b.receiver).is_empty());
    }

    #[tokio::test]
    async fn test_client_select_track() {
        let registry = SessionRegistry::new();
        let id = registry.create_session().await.unwrap();
        registry
            .init_session(
                &id,
                "Movie",
                vec![("en.srt".into(), SRT.into()), ("fr.srt".into(), SRT.into())],
            )
            .await
            .unwrap();
        let scope = Scope::Session(id.clone());
        let mut conn = registry.connect(scope.clone()).await.unwrap();
        drain(&mut conn.receiver);

        registry
            .handle_client_message(
                &scope,
                ClientMessage::SelectTrack {
                    track: "fr.srt".into(),
                },
            )
            .await
            .unwrap();

        let session = registry.get(&id).await.unwrap();
        assert_eq!(session.lock().await.current_track_name(), Some("fr.srt"));
        assert!(matches!(
            drain(&mut conn.receiver).last(),
            Some(ServerMessage::SubtitlesInit { .. })
        ));

        let unknown = registry
            .handle_client_message(
                &scope,
                ClientMessage::SelectTrack {
                    track: "xx.srt".into(),
                },
            )
            .await;
        assert!(matches!(unknown, Err(Error::TrackNotFound(_))));
        assert!(drain(&mut conn.receiver).is_empty());
    }

    #[tokio::test]
    async fn test_delete_notifies_and_closes() {
        let registry = SessionRegistry::new();
        let id = registry.create_session().await.unwrap();
        let mut conn = registry.connect(Scope::Session(id.clone())).await.unwrap();
        drain(&mut conn.receiver);

        assert!(registry.delete_session(&id).await);

        assert_eq!(
            conn.receiver.recv().await.unwrap().messages(),
            &[ServerMessage::SessionClosed]
        );
        assert!(conn.receiver.recv().await.is_none());
        assert!(registry.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let registry = SessionRegistry::new();
        let id = registry.create_session().await.unwrap();

        assert!(!registry.delete_session(&SessionId::from("missing")).await);
        assert!(registry.delete_session(&id).await);
        assert!(!registry.delete_session(&id).await);
        assert_eq!(registry.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_global_subscribers_see_session_list() {
        let registry = SessionRegistry::new();
        let mut global = registry.connect(Scope::Global).await.unwrap();
        assert_eq!(
            last_session_list(&drain(&mut global.receiver)),
            Some(vec![])
        );

        let id = registry.create_session().await.unwrap();
        let list = last_session_list(&drain(&mut global.receiver)).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, id);

        registry
            .init_session(&id, "Movie", vec![("en.srt".into(), SRT.into())])
            .await
            .unwrap();
        let list = last_session_list(&drain(&mut global.receiver)).unwrap();
        assert_eq!(list[0].video_title, "Movie");
        assert_eq!(list[0].tracks_loaded, 1);

        registry.delete_session(&id).await;
        assert_eq!(
            last_session_list(&drain(&mut global.receiver)),
            Some(vec![])
        );
    }

    #[tokio::test]
    async fn test_global_ignores_select_track() {
        let registry = SessionRegistry::new();

        let result = registry
            .handle_client_message(
                &Scope::Global,
                ClientMessage::SelectTrack {
                    track: "en.srt".into(),
                },
            )
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_capacity_rejects_new_connections_only() {
        let registry = SessionRegistry::with_config(RegistryConfig::default().max_subscribers(1));
        let id = registry.create_session().await.unwrap();
        let scope = Scope::Session(id.clone());

        let mut first = registry.connect(scope.clone()).await.unwrap();
        drain(&mut first.receiver);

        assert!(matches!(
            registry.connect(scope.clone()).await,
            Err(Error::CapacityExceeded { limit: 1 })
        ));

        registry.update_position(&id, 1).await.unwrap();
        registry.disconnect(&scope, first.id).await;
        assert!(registry.connect(scope).await.is_ok());
    }

    #[tokio::test]
    async fn test_disconnect() {
        let registry = SessionRegistry::new();
        let id = registry.create_session().await.unwrap();
        let scope = Scope::Session(id.clone());
        let conn = registry.connect(scope.clone()).await.unwrap();
        let global = registry.connect(Scope::Global).await.unwrap();

        assert_eq!(registry.health().await.total_subscribers, 2);

        registry.disconnect(&scope, conn.id).await;
        registry.disconnect(&Scope::Global, global.id).await;

        let health = registry.health().await;
        assert_eq!(health.total_subscribers, 0);
        assert_eq!(health.active_sessions, 1);
    }

    #[tokio::test]
    async fn test_subscriber_ids_unique_across_scopes() {
        let registry = SessionRegistry::new();
        let id = registry.create_session().await.unwrap();

        let a = registry.connect(Scope::Global).await.unwrap();
        let b = registry.connect(Scope::Session(id)).await.unwrap();

        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_list_sessions_reports_subscribers() {
        let registry = SessionRegistry::new();
        let id = registry.create_session().await.unwrap();
        let _conn = registry.connect(Scope::Session(id.clone())).await.unwrap();

        let list = registry.list_sessions().await;

        assert_eq!(list.len(), 1);
        assert_eq!(list[0].subscriber_count, 1);
        assert_eq!(list[0].current_track, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_stale() {
        let config = RegistryConfig::default().stale_session_timeout(Duration::from_secs(10));
        let registry = SessionRegistry::with_config(config);
        let stale = registry.create_session().await.unwrap();
        let fresh = registry.create_session().await.unwrap();
        let mut conn = registry.connect(Scope::Session(stale.clone())).await.unwrap();
        drain(&mut conn.receiver);

        tokio::time::advance(Duration::from_secs(8)).await;
        registry.update_position(&fresh, 0).await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;

        let evicted = registry.evict_stale().await;

        assert_eq!(evicted, vec![stale.clone()]);
        assert!(registry.get(&stale).await.is_none());
        assert!(registry.get(&fresh).await.is_some());
        assert_eq!(
            conn.receiver.recv().await.unwrap().messages(),
            &[ServerMessage::SessionClosed]
        );
        assert!(conn.receiver.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_skips_busy_session() {
        let config = RegistryConfig::default().stale_session_timeout(Duration::from_secs(1));
        let registry = SessionRegistry::with_config(config);
        let id = registry.create_session().await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;

        let session = registry.get(&id).await.unwrap();
        let guard = session.lock().await;
        assert!(registry.evict_stale().await.is_empty());
        drop(guard);

        assert_eq!(registry.evict_stale().await, vec![id]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_clock() {
        let registry = SessionRegistry::new();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(
            registry.idle_elapsed(Instant::now()).await,
            Some(Duration::from_secs(3))
        );

        let id = registry.create_session().await.unwrap();
        assert_eq!(registry.idle_elapsed(Instant::now()).await, None);

        tokio::time::advance(Duration::from_secs(60)).await;
        registry.delete_session(&id).await;
        assert_eq!(
            registry.idle_elapsed(Instant::now()).await,
            Some(Duration::ZERO)
        );
    }

    #[tokio::test]
    async fn test_shutdown_refuses_new_work() {
        let registry = SessionRegistry::new();
        registry.begin_shutdown();

        assert!(matches!(
            registry.create_session().await,
            Err(Error::ShuttingDown)
        ));
        assert!(matches!(
            registry.connect(Scope::Global).await,
            Err(Error::ShuttingDown)
        ));
        assert!(registry.health().await.shutting_down);
    }

    #[tokio::test]
    async fn test_teardown_closes_everything() {
        let registry = SessionRegistry::new();
        let id = registry.create_session().await.unwrap();
        let mut session_conn = registry.connect(Scope::Session(id)).await.unwrap();
        let mut global_conn = registry.connect(Scope::Global).await.unwrap();
        drain(&mut session_conn.receiver);
        drain(&mut global_conn.receiver);

        registry.teardown().await;

        assert_eq!(
            session_conn.receiver.recv().await.unwrap().messages(),
            &[ServerMessage::SessionClosed]
        );
        assert!(session_conn.receiver.recv().await.is_none());
        assert!(global_conn.receiver.recv().await.is_none());
        assert_eq!(registry.session_count().await, 0);
        assert!(registry.is_shutting_down());
    }

    struct RejectingParser;

    impl SubtitleParser for RejectingParser {
        fn parse(&self, _raw: &str) -> std::result::Result<Vec<SubtitleEntry>, ParseError> {
            Err(ParseError::Empty)
        }
    }

    #[tokio::test]
    async fn test_session_without_tracks_stays_silent() {
        let registry =
            SessionRegistry::with_parser(RegistryConfig::default(), Arc::new(RejectingParser));
        let id = registry.create_session().await.unwrap();
        let report = registry
            .init_session(&id, "Movie", vec![("en.srt".into(), SRT.into())])
            .await
            .unwrap();
        assert!(report.tracks.is_empty());

        let mut conn = registry.connect(Scope::Session(id.clone())).await.unwrap();
        drain(&mut conn.receiver);

        for position in [0, 5000, 1000, 99_000] {
            assert_eq!(
                registry.update_position(&id, position).await.unwrap(),
                Delta::NoChange
            );
        }
        assert!(drain(&mut conn.receiver).is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_updates_keep_cursor_consistent() {
        let registry = Arc::new(SessionRegistry::new());
        let id = registry.create_session().await.unwrap();
        registry
            .init_session(
                &id,
                "Movie",
                vec![("en.srt".into(), SRT.into()), ("fr.srt".into(), SRT.into())],
            )
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for i in 0..16u64 {
            let registry = Arc::clone(&registry);
            let id = id.clone();
            tasks.push(tokio::spawn(async move {
                for step in 0..50u64 {
                    let position = (i * 997 + step * 131) % 7000;
                    registry.update_position(&id, position).await.unwrap();
                    if step % 10 == 0 {
                        let track = if (i + step) % 2 == 0 { "en.srt" } else { "fr.srt" };
                        registry.select_track(&id, track).await.unwrap();
                    }
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let session = registry.get(&id).await.unwrap();
        let session = session.lock().await;
        let entries = session.current_track().unwrap().entries();
        assert_eq!(
            session.visible_count(),
            crate::timeline::visible_count(entries, session.position_ms())
        );
    }
}
