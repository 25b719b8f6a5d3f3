use std::sync::Arc;

use axum::extract::ws::Message;
use inkwire_shared::{decode_binary, decode_json, DrawMessage};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::ServerError;
use crate::state::Session;

/// Decodes a data frame to make sure it is a well-formed draw message.
/// The frame itself is what gets relayed, untouched.
pub fn validate_frame(frame: &Message) -> Result<DrawMessage, ServerError> {
    let message = match frame {
        Message::Text(text) => decode_json(text)?,
        Message::Binary(data) => decode_binary(data)?,
        _ => return Err(ServerError::UnsupportedFrame),
    };
    if !message.is_well_formed() {
        return Err(ServerError::Malformed {
            kind: message.kind(),
        });
    }
    Ok(message)
}

/// Queues `frame` for every peer but the sender and returns how many peers took it.
///
/// A peer whose queue is full misses this frame. A peer whose channel is closed
/// is removed from the session.
pub async fn broadcast_except(
    session: &Arc<RwLock<Session>>,
    sender: Uuid,
    frame: Message,
) -> usize {
    let mut stale = Vec::new();
    let mut delivered = 0;
    {
        let session = session.read().await;
        for (id, tx) in session.peers.iter() {
            if *id == sender {
                continue;
            }
            match tx.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(peer = %id, "peer queue full, dropping frame");
                }
                Err(TrySendError::Closed(_)) => stale.push(*id),
            }
        }
    }

    if !stale.is_empty() {
        let mut session = session.write().await;
        for id in stale {
            session.peers.remove(&id);
        }
    }
    delivered
}

#[cfg(test)]
mod tests {
    use inkwire_shared::encode_binary;
    use tokio::sync::mpsc;

    use super::*;

    fn draw_frame() -> Message {
        Message::Text(
            r##"{"type":"draw","x":1,"y":1,"x2":2,"y2":2,"color":"#000","lineWidth":2}"##.into(),
        )
    }

    #[test]
    fn accepts_text_and_binary_frames() {
        assert!(validate_frame(&draw_frame()).is_ok());
        let payload = encode_binary(&DrawMessage::DrawEnd).unwrap();
        assert_eq!(
            validate_frame(&Message::Binary(payload)).unwrap(),
            DrawMessage::DrawEnd
        );
    }

    #[test]
    fn rejects_garbage_and_malformed_messages() {
        assert!(validate_frame(&Message::Text("hello".into())).is_err());
        let empty_color = Message::Text(
            r#"{"type":"drawStart","x":1,"y":1,"color":"","lineWidth":2}"#.into(),
        );
        assert!(matches!(
            validate_frame(&empty_color),
            Err(ServerError::Malformed { kind: "drawStart" })
        ));
        assert!(matches!(
            validate_frame(&Message::Ping(Vec::new())),
            Err(ServerError::UnsupportedFrame)
        ));
    }

    #[test]
    fn binary_frame_claiming_huge_string_is_rejected() {
        let mut payload = vec![1u8];
        payload.extend_from_slice(&[0u8; 16]);
        payload.push(253);
        payload.extend_from_slice(&(1u64 << 40).to_le_bytes());
        assert!(matches!(
            validate_frame(&Message::Binary(payload)),
            Err(ServerError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn broadcast_skips_sender() {
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut session = Session::default();
        session.peers.insert(a, tx_a);
        session.peers.insert(b, tx_b);
        let session = Arc::new(RwLock::new(session));

        let delivered = broadcast_except(&session, a, draw_frame()).await;

        assert_eq!(delivered, 1);
        assert_eq!(rx_b.recv().await, Some(draw_frame()));
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_queue_drops_frame_but_keeps_peer() {
        let (tx_a, _rx_a) = mpsc::channel(1);
        let (tx_b, mut rx_b) = mpsc::channel(1);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut session = Session::default();
        session.peers.insert(a, tx_a);
        session.peers.insert(b, tx_b);
        let session = Arc::new(RwLock::new(session));

        assert_eq!(broadcast_except(&session, a, draw_frame()).await, 1);
        assert_eq!(broadcast_except(&session, a, draw_frame()).await, 0);
        assert_eq!(session.read().await.peers.len(), 2);

        assert_eq!(rx_b.recv().await, Some(draw_frame()));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_peer_is_removed() {
        let (tx_a, _rx_a) = mpsc::channel(4);
        let (tx_b, rx_b) = mpsc::channel(4);
        drop(rx_b);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut session = Session::default();
        session.peers.insert(a, tx_a);
        session.peers.insert(b, tx_b);
        let session = Arc::new(RwLock::new(session));

        assert_eq!(broadcast_except(&session, a, draw_frame()).await, 0);
        let session = session.read().await;
        assert!(session.peers.contains_key(&a));
        assert!(!session.peers.contains_key(&b));
    }
}
