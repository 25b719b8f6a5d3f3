use thiserror::Error;

use crate::{DrawMessage, MAX_FRAME_BYTES};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid json frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid binary frame: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("failed to encode binary frame: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("binary frame has {0} trailing bytes")]
    TrailingBytes(usize),
    #[error("unknown wire format: {0}")]
    UnknownFormat(String),
}

pub fn encode_json(message: &DrawMessage) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

pub fn decode_json(text: &str) -> Result<DrawMessage, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

pub fn encode_binary(message: &DrawMessage) -> Result<Vec<u8>, ProtocolError> {
    Ok(bincode::encode_to_vec(message, bincode::config::standard())?)
}

pub fn decode_binary(payload: &[u8]) -> Result<DrawMessage, ProtocolError> {
    // Length prefixes come from the peer, so allocations are capped up front.
    let config = bincode::config::standard().with_limit::<MAX_FRAME_BYTES>();
    let (message, read) = bincode::decode_from_slice::<DrawMessage, _>(payload, config)?;
    if read != payload.len() {
        return Err(ProtocolError::TrailingBytes(payload.len() - read));
    }
    Ok(message)
}
