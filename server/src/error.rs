use inkwire_shared::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("rejected {kind} message: invalid coordinates, color or width")]
    Malformed { kind: &'static str },
    #[error("unsupported frame type")]
    UnsupportedFrame,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
