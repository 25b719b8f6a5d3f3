use inkwire_shared::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("invalid config value for {key}: {value}")]
    ConfigValue { key: &'static str, value: String },
    #[error("snapshot of {width}x{height} does not match its pixel data")]
    SnapshotSize { width: u32, height: u32 },
    #[error("transport: {0}")]
    Transport(String),
}
