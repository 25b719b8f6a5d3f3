use inkwire_shared::{
    decode_binary, decode_json, encode_binary, encode_json, DrawMessage, Point, WireFormat,
};

use crate::config::BackoffConfig;
use crate::connection::{Connection, ConnectionAction, ConnectionEvent, ConnectionState};
use crate::error::ClientError;
use crate::surface::{RasterSurface, StrokeSegment};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WireFrame {
    Text(String),
    Binary(Vec<u8>),
}

impl WireFrame {
    pub fn encode(message: &DrawMessage, format: WireFormat) -> Result<Self, ClientError> {
        Ok(match format {
            WireFormat::Json => WireFrame::Text(encode_json(message)?),
            WireFormat::Binary => WireFrame::Binary(encode_binary(message)?),
        })
    }

    pub fn decode(&self) -> Result<DrawMessage, ClientError> {
        Ok(match self {
            WireFrame::Text(text) => decode_json(text)?,
            WireFrame::Binary(data) => decode_binary(data)?,
        })
    }
}

/// The connection to the relay as seen by the sync client.
pub trait Transport {
    fn send(&mut self, frame: WireFrame) -> Result<(), ClientError>;

    fn close(&mut self) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendStatus {
    Sent,
    /// Not connected, or the transport refused the frame. Nothing is queued.
    Dropped,
}

/// Bridges local strokes to the relay and remote strokes to the surface.
///
/// Sends are best effort: nothing is buffered while disconnected, so a drop
/// never builds a backlog that would replay out of order later.
pub struct SyncClient<T: Transport> {
    transport: T,
    format: WireFormat,
    connection: Connection,
}

impl<T: Transport> SyncClient<T> {
    pub fn new(transport: T, format: WireFormat, backoff: BackoffConfig) -> Self {
        Self {
            transport,
            format,
            connection: Connection::new(backoff),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn handle_connection_event(&mut self, event: ConnectionEvent) -> ConnectionAction {
        let action = self.connection.handle(event);
        if action == ConnectionAction::Close {
            self.transport.close();
        }
        action
    }

    pub fn send_start(&mut self, at: Point, color: &str, line_width: f32) -> SendStatus {
        self.send(&DrawMessage::DrawStart {
            x: at.x,
            y: at.y,
            color: color.to_string(),
            line_width,
        })
    }

    pub fn send_segment(&mut self, segment: &StrokeSegment) -> SendStatus {
        self.send(&segment.to_message())
    }

    pub fn send_end(&mut self) -> SendStatus {
        self.send(&DrawMessage::DrawEnd)
    }

    fn send(&mut self, message: &DrawMessage) -> SendStatus {
        if !self.connection.is_connected() {
            return SendStatus::Dropped;
        }
        let frame = match WireFrame::encode(message, self.format) {
            Ok(frame) => frame,
            Err(error) => {
                log::warn!("failed to encode {}: {error}", message.kind());
                return SendStatus::Dropped;
            }
        };
        match self.transport.send(frame) {
            Ok(()) => SendStatus::Sent,
            Err(error) => {
                log::warn!("failed to send {}: {error}", message.kind());
                SendStatus::Dropped
            }
        }
    }
}

/// Draws a peer's message onto the local surface. Returns whether anything
/// was drawn or a path was started.
///
/// Never touches local history or pointer state.
pub fn apply_remote<S: RasterSurface + ?Sized>(surface: &mut S, message: &DrawMessage) -> bool {
    match message {
        DrawMessage::DrawStart { x, y, .. } => {
            let at = Point::new(*x, *y);
            if !at.is_finite() {
                return false;
            }
            surface.begin_path(at);
            true
        }
        DrawMessage::Draw { .. } => match StrokeSegment::from_message(message) {
            Some(segment) => {
                surface.stroke_segment(&segment);
                true
            }
            None => false,
        },
        DrawMessage::DrawEnd => false,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Transport that records every frame it is asked to send.
    #[derive(Default)]
    pub struct RecordingTransport {
        pub frames: Vec<WireFrame>,
        pub closed: bool,
        pub fail: bool,
    }

    impl RecordingTransport {
        pub fn messages(&self) -> Vec<DrawMessage> {
            self.frames
                .iter()
                .map(|frame| frame.decode().unwrap())
                .collect()
        }
    }

    impl Transport for RecordingTransport {
        fn send(&mut self, frame: WireFrame) -> Result<(), ClientError> {
            if self.fail {
                return Err(ClientError::Transport("socket closed".into()));
            }
            self.frames.push(frame);
            Ok(())
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    pub fn connected_client(format: WireFormat) -> SyncClient<RecordingTransport> {
        let mut client =
            SyncClient::new(RecordingTransport::default(), format, BackoffConfig::default());
        client.handle_connection_event(ConnectionEvent::Start);
        client.handle_connection_event(ConnectionEvent::Open);
        client
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::render::PixelBuffer;

    #[test]
    fn sends_nothing_until_connected() {
        let mut client = SyncClient::new(
            RecordingTransport::default(),
            WireFormat::Json,
            BackoffConfig::default(),
        );
        assert_eq!(client.send_end(), SendStatus::Dropped);
        assert!(client.transport().frames.is_empty());
    }

    #[test]
    fn outbound_messages_follow_wire_shape() {
        let mut client = connected_client(WireFormat::Json);
        client.send_start(Point::new(1.0, 2.0), "#111", 3.0);
        client.send_segment(&StrokeSegment {
            from: Point::new(1.0, 2.0),
            to: Point::new(4.0, 5.0),
            color: "#111".into(),
            width: 3.0,
        });
        client.send_end();

        let start = r##"{"type":"drawStart","x":1.0,"y":2.0,"color":"#111","lineWidth":3.0}"##;
        let segment =
            r##"{"type":"draw","x":1.0,"y":2.0,"x2":4.0,"y2":5.0,"color":"#111","lineWidth":3.0}"##;
        let frames = &client.transport().frames;
        assert_eq!(frames[0], WireFrame::Text(start.into()));
        assert_eq!(frames[1], WireFrame::Text(segment.into()));
        assert_eq!(frames[2], WireFrame::Text(r#"{"type":"drawEnd"}"#.into()));
    }

    #[test]
    fn binary_format_uses_binary_frames() {
        let mut client = connected_client(WireFormat::Binary);
        assert_eq!(client.send_end(), SendStatus::Sent);
        assert!(matches!(client.transport().frames[0], WireFrame::Binary(_)));
        assert_eq!(client.transport().messages(), vec![DrawMessage::DrawEnd]);
    }

    #[test]
    fn failed_transport_reports_dropped() {
        let mut client = connected_client(WireFormat::Json);
        client.transport_mut().fail = true;
        assert_eq!(client.send_end(), SendStatus::Dropped);
    }

    #[test]
    fn shutdown_closes_transport() {
        let mut client = connected_client(WireFormat::Json);
        assert_eq!(
            client.handle_connection_event(ConnectionEvent::Shutdown),
            ConnectionAction::Close
        );
        assert!(client.transport().closed);
        assert_eq!(client.send_end(), SendStatus::Dropped);
    }

    #[test]
    fn remote_sequence_draws_single_segment() {
        let mut buffer = PixelBuffer::new(40, 40);
        let messages = [
            DrawMessage::DrawStart {
                x: 10.0,
                y: 10.0,
                color: "#000".into(),
                line_width: 2.0,
            },
            DrawMessage::Draw {
                x: 10.0,
                y: 10.0,
                x2: 20.0,
                y2: 20.0,
                color: "#000".into(),
                line_width: 2.0,
            },
            DrawMessage::DrawEnd,
        ];
        for message in &messages {
            apply_remote(&mut buffer, message);
        }
        assert!(buffer.is_painted(10, 10));
        assert!(buffer.is_painted(15, 15));
        assert!(buffer.is_painted(20, 20));
        assert!(!buffer.is_painted(25, 25));
        assert!(!buffer.is_painted(10, 20));
    }

    #[test]
    fn remote_segment_uses_sender_color() {
        let mut buffer = PixelBuffer::new(10, 10);
        apply_remote(
            &mut buffer,
            &DrawMessage::Draw {
                x: 2.0,
                y: 5.0,
                x2: 8.0,
                y2: 5.0,
                color: "#00ff00".into(),
                line_width: 2.0,
            },
        );
        assert_eq!(buffer.pixel(5, 5), Some(image::Rgba([0, 255, 0, 255])));
    }

    #[test]
    fn frames_decode_both_formats() {
        let text = WireFrame::Text(r#"{"type":"drawEnd"}"#.into());
        assert_eq!(text.decode().unwrap(), DrawMessage::DrawEnd);
        let binary = WireFrame::encode(&DrawMessage::DrawEnd, WireFormat::Binary).unwrap();
        assert_eq!(binary.decode().unwrap(), DrawMessage::DrawEnd);
        assert!(WireFrame::Text("{}".into()).decode().is_err());
    }
}
