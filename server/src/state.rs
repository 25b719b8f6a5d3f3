use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_PEER_QUEUE: usize = 256;
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = inkwire_shared::MAX_FRAME_BYTES;
pub const LOBBY_SESSION: &str = "lobby";

#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub bind: IpAddr,
    pub port: u16,
    pub public_dir: PathBuf,
    /// Outbound frames buffered per peer before further frames are dropped for it.
    pub peer_queue: usize,
    pub max_message_bytes: usize,
}

impl RelayConfig {
    pub fn new(public_dir: PathBuf) -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            public_dir,
            peer_queue: DEFAULT_PEER_QUEUE,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<String, Arc<RwLock<Session>>>>>,
    pub config: Arc<RelayConfig>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config: Arc::new(config),
        }
    }
}

/// Peers sharing one drawing room. The relay keeps no drawing content.
#[derive(Default)]
pub struct Session {
    pub peers: HashMap<Uuid, mpsc::Sender<Message>>,
}
