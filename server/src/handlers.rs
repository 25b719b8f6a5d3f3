use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::logic::{broadcast_except, validate_frame};
use crate::sessions::{join_session, normalize_session_id, remove_if_empty};
use crate::state::{AppState, LOBBY_SESSION};

pub async fn ping_handler() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

pub async fn health_handler() -> &'static str {
    "ok"
}

pub async fn session_handler(
    Path(session_id): Path<String>,
    axum::Extension(index_file): axum::Extension<std::path::PathBuf>,
) -> impl IntoResponse {
    if normalize_session_id(&session_id).is_none() {
        return StatusCode::NOT_FOUND.into_response();
    }
    match tokio::fs::read_to_string(index_file).await {
        Ok(contents) => Html(contents).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

pub async fn lobby_ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade(ws, state, LOBBY_SESSION.to_string())
}

pub async fn ws_handler(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let session_id = match normalize_session_id(&session_id) {
        Some(id) => id,
        None => return StatusCode::NOT_FOUND.into_response(),
    };
    upgrade(ws, state, session_id).into_response()
}

fn upgrade(ws: WebSocketUpgrade, state: AppState, session_id: String) -> axum::response::Response {
    let max_message_bytes = state.config.max_message_bytes;
    ws.max_message_size(max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state, session_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, session_id: String) {
    let (mut socket_sender, mut socket_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(state.config.peer_queue.max(1));
    let connection_id = Uuid::new_v4();

    let (session, peers) = join_session(&state, &session_id, connection_id, tx).await;
    info!(
        session = %session_id,
        conn = %connection_id,
        peers,
        "ws connected"
    );

    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if socket_sender.send(frame).await.is_err() {
                break;
            }
        }
    });

    let mut close_frame = None;

    while let Some(result) = socket_receiver.next().await {
        let message = match result {
            Ok(message) => message,
            Err(error) => {
                warn!(session = %session_id, conn = %connection_id, %error, "ws receive failed");
                break;
            }
        };
        match message {
            Message::Text(_) | Message::Binary(_) => match validate_frame(&message) {
                Ok(draw) => {
                    let delivered = broadcast_except(&session, connection_id, message).await;
                    debug!(
                        session = %session_id,
                        conn = %connection_id,
                        kind = draw.kind(),
                        delivered,
                        "relayed"
                    );
                }
                Err(error) => {
                    warn!(session = %session_id, conn = %connection_id, %error, "dropping frame");
                }
            },
            Message::Close(frame) => {
                close_frame = frame;
                break;
            }
            _ => {}
        }
    }

    {
        let mut session = session.write().await;
        session.peers.remove(&connection_id);
        info!(
            session = %session_id,
            conn = %connection_id,
            peers = session.peers.len(),
            "ws disconnected"
        );
        if let Some(frame) = &close_frame {
            debug!(
                session = %session_id,
                conn = %connection_id,
                code = frame.code,
                reason = %frame.reason,
                "ws close frame"
            );
        }
    }
    send_task.abort();

    remove_if_empty(&state, &session_id, &session).await;
}
