//! WebSocket transport for viewers
//!
//! Each socket becomes one registry subscriber. The socket task drains the
//! subscriber queue onto the wire, forwards client messages to the registry
//! and pings the peer every heartbeat interval. When the registry drops the
//! subscriber the queue ends and the socket is closed.

use std::borrow::Cow;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use tokio::time::{Instant, MissedTickBehavior};

use super::routes::AppState;
use crate::error::Error;
use crate::registry::{Connection, Scope};
use crate::session::{ClientMessage, Push, SessionId};

/// Close code for a session id the registry does not know
const SESSION_NOT_FOUND: u16 = 4404;

/// `GET /sessions/:id/ws`
pub async fn session_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let scope = Scope::Session(SessionId::from(id));
    ws.on_upgrade(move |socket| serve_socket(socket, state, scope))
}

/// `GET /ws`
pub async fn global_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, state, Scope::Global))
}

async fn serve_socket(mut socket: WebSocket, state: AppState, scope: Scope) {
    let mut connection = match state.registry.connect(scope.clone()).await {
        Ok(connection) => connection,
        Err(e) => {
            tracing::info!(scope = %scope, error = %e, "Rejecting WebSocket connection");
            let _ = socket.send(Message::Close(Some(close_frame(&e)))).await;
            return;
        }
    };

    tracing::info!(scope = %connection.scope, subscriber = %connection.id, "WebSocket connected");

    run_connection(&mut socket, &state, &mut connection).await;

    state
        .registry
        .disconnect(&connection.scope, connection.id)
        .await;
    tracing::info!(scope = %connection.scope, subscriber = %connection.id, "WebSocket disconnected");
}

async fn run_connection(socket: &mut WebSocket, state: &AppState, connection: &mut Connection) {
    let period = state.heartbeat_interval;
    let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            push = connection.receiver.recv() => match push {
                Some(push) => {
                    if send_push(socket, &push).await.is_err() {
                        break;
                    }
                }
                None => {
                    // Dropped by the registry: deleted, evicted or torn down
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    handle_text(state, &connection.scope, &text).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(subscriber = %connection.id, error = %e, "WebSocket receive failed");
                    break;
                }
            },
            _ = heartbeat.tick() => {
                if socket.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn send_push(socket: &mut WebSocket, push: &Push) -> Result<(), axum::Error> {
    for text in encode_push(push) {
        socket.send(Message::Text(text)).await?;
    }
    Ok(())
}

/// One JSON text frame per message, in order
fn encode_push(push: &Push) -> Vec<String> {
    push.messages()
        .iter()
        .filter_map(|message| match serde_json::to_string(message) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode message");
                None
            }
        })
        .collect()
}

async fn handle_text(state: &AppState, scope: &Scope, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(scope = %scope, error = %e, "Ignoring unrecognized client message");
            return;
        }
    };

    if let Err(e) = state.registry.handle_client_message(scope, message).await {
        tracing::warn!(scope = %scope, error = %e, "Client message rejected");
    }
}

fn close_frame(error: &Error) -> CloseFrame<'static> {
    let (code, reason) = match error {
        Error::CapacityExceeded { .. } => (close_code::POLICY, "Server at capacity"),
        Error::SessionNotFound(_) => (SESSION_NOT_FOUND, "Session not found"),
        Error::ShuttingDown => (close_code::AWAY, "Server shutting down"),
        _ => (close_code::ERROR, "Internal error"),
    };

    CloseFrame {
        code,
        reason: Cow::Borrowed(reason),
    }
}
