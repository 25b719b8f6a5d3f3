use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::state::{AppState, Session};

const MAX_SESSION_ID_LEN: usize = 64;

pub fn normalize_session_id(value: &str) -> Option<String> {
    if value.is_empty() || value.len() > MAX_SESSION_ID_LEN {
        return None;
    }
    let valid = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return None;
    }
    Some(value.to_string())
}

/// Registers `peer` in the session, creating it if needed, and returns the
/// session with its new peer count.
///
/// The insert happens under the registry lock, so `remove_if_empty` can never
/// drop a session between lookup and join.
pub async fn join_session(
    state: &AppState,
    session_id: &str,
    peer: Uuid,
    tx: mpsc::Sender<Message>,
) -> (Arc<RwLock<Session>>, usize) {
    let mut sessions = state.sessions.write().await;
    let session = sessions
        .entry(session_id.to_string())
        .or_insert_with(|| {
            debug!(session = session_id, "creating session");
            Arc::new(RwLock::new(Session::default()))
        })
        .clone();
    let peers = {
        let mut session = session.write().await;
        session.peers.insert(peer, tx);
        session.peers.len()
    };
    (session, peers)
}

/// Drops the session from the registry once its last peer is gone.
pub async fn remove_if_empty(state: &AppState, session_id: &str, session: &Arc<RwLock<Session>>) {
    if !session.read().await.peers.is_empty() {
        return;
    }
    let mut sessions = state.sessions.write().await;
    if let Some(current) = sessions.get(session_id) {
        if Arc::ptr_eq(current, session) && current.read().await.peers.is_empty() {
            sessions.remove(session_id);
            debug!(session = session_id, "removed empty session");
        }
    }
}
