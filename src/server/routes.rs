//! HTTP routes
//!
//! | Path                       | Method | Operation                  |
//! |----------------------------|--------|----------------------------|
//! | `/health`                  | GET    | health report              |
//! | `/sessions`                | GET    | list sessions              |
//! | `/sessions`                | POST   | create a session           |
//! | `/sessions/:id`            | DELETE | delete a session           |
//! | `/sessions/:id/init`       | POST   | load subtitle tracks       |
//! | `/sessions/:id/time`       | POST   | update playback position   |
//! | `/sessions/:id/track`      | POST   | select the current track   |
//! | `/sessions/:id/ws`         | GET    | session WebSocket          |
//! | `/ws`                      | GET    | session-list WebSocket     |
//! | `/shutdown`                | POST   | graceful shutdown          |

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::ws;
use crate::error::Error;
use crate::lifecycle::{initiate_shutdown, ShutdownSignal};
use crate::registry::SessionRegistry;
use crate::session::{InitReport, SessionId};
use crate::stats::HealthReport;

/// Shared state passed to all request handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub shutdown: ShutdownSignal,
    pub heartbeat_interval: Duration,
}

/// Build the router with all endpoints
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/:id", delete(delete_session))
        .route("/sessions/:id/init", post(init_session))
        .route("/sessions/:id/time", post(update_time))
        .route("/sessions/:id/track", post(select_track))
        .route("/sessions/:id/ws", get(ws::session_socket))
        .route("/ws", get(ws::global_socket))
        .route("/shutdown", post(shutdown))
        .with_state(state)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::SessionNotFound(_) | Error::TrackNotFound(_) => StatusCode::NOT_FOUND,
            Error::CapacityExceeded { .. } | Error::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(json!({ "status": "error", "error": self.to_string() })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct InitRequest {
    pub video_title: String,
    /// Track name → raw subtitle text, in document order
    #[serde(deserialize_with = "ordered_tracks")]
    pub subtitle_tracks: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
pub struct TimeUpdate {
    pub time_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct TrackSelection {
    pub track: String,
}

#[derive(Serialize)]
struct InitResponse {
    status: &'static str,
    #[serde(flatten)]
    report: InitReport,
}

/// Deserialize a JSON object into name/value pairs without losing key order
///
/// The first key is the track that becomes current.
fn ordered_tracks<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct TracksVisitor;

    impl<'de> Visitor<'de> for TracksVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an object mapping track names to subtitle text")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut tracks = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, text)) = map.next_entry::<String, String>()? {
                tracks.push((name, text));
            }
            Ok(tracks)
        }
    }

    deserializer.deserialize_map(TracksVisitor)
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.registry.health().await)
}

async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let sessions = state.registry.list_sessions().await;
    Json(json!({ "sessions": sessions }))
}

async fn create_session(State(state): State<AppState>) -> Result<impl IntoResponse, Error> {
    let id = state.registry.create_session().await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "ok", "session_id": id })),
    ))
}

async fn init_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<InitRequest>,
) -> Result<impl IntoResponse, Error> {
    let id = SessionId::from(id);
    tracing::info!(session = %id, title = %req.video_title, "Initializing session");

    let report = state
        .registry
        .init_session(&id, req.video_title, req.subtitle_tracks)
        .await?;

    Ok(Json(InitResponse {
        status: "ok",
        report,
    }))
}

async fn update_time(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TimeUpdate>,
) -> Result<impl IntoResponse, Error> {
    state
        .registry
        .update_position(&SessionId::from(id), req.time_ms)
        .await?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn select_track(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TrackSelection>,
) -> Result<impl IntoResponse, Error> {
    state
        .registry
        .select_track(&SessionId::from(id), &req.track)
        .await?;
    Ok(Json(json!({ "status": "ok", "currentTrack": req.track })))
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let deleted = state.registry.delete_session(&SessionId::from(id)).await;
    Json(json!({ "status": "ok", "deleted": deleted }))
}

async fn shutdown(State(state): State<AppState>) -> impl IntoResponse {
    tracing::info!("Shutdown requested via API");

    let grace = state.registry.config().shutdown_grace;
    tokio::spawn(initiate_shutdown(
        Arc::clone(&state.registry),
        state.shutdown.clone(),
        grace,
    ));

    Json(json!({ "status": "shutting down" }))
}
