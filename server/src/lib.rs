//! Stateless websocket relay for inkwire drawing sessions.
//!
//! Each peer joins a session (`/ws` for the lobby, `/ws/:session_id` for a named
//! one). Every valid draw frame a peer sends is forwarded verbatim to the other
//! peers of that session and never echoed back.

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

mod error;
mod handlers;
mod logic;
mod sessions;
mod state;

pub use crate::error::ServerError;
pub use crate::state::{
    AppState, RelayConfig, DEFAULT_MAX_MESSAGE_BYTES, DEFAULT_PEER_QUEUE, DEFAULT_PORT,
    LOBBY_SESSION,
};

use crate::handlers::{
    health_handler, lobby_ws_handler, ping_handler, session_handler, ws_handler,
};

pub fn router(state: AppState) -> Router {
    let public_dir = state.config.public_dir.clone();
    let index_file = public_dir.join("index.html");

    Router::new()
        .route("/ping", get(ping_handler))
        .route("/health", get(health_handler))
        .route("/s/:session_id", get(session_handler))
        .route("/ws", get(lobby_ws_handler))
        .route("/ws/:session_id", get(ws_handler))
        .fallback_service(ServeDir::new(public_dir).append_index_html_on_directories(true))
        .layer(axum::Extension(index_file))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: RelayConfig) -> Result<(), ServerError> {
    let listener = TcpListener::bind(config.socket_addr()).await?;
    serve_on(listener, config).await
}

pub async fn serve_on(listener: TcpListener, config: RelayConfig) -> Result<(), ServerError> {
    let addr = listener.local_addr()?;
    info!("inkwire relay listening on http://{addr}");
    info!(public_dir = %config.public_dir.display(), "serving static files");
    axum::serve(listener, router(AppState::new(config))).await?;
    Ok(())
}
