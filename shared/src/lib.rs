use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

mod codec;

pub use codec::{decode_binary, decode_json, encode_binary, encode_json, ProtocolError};

pub const DEFAULT_COLOR: &str = "#000000";
pub const DEFAULT_LINE_WIDTH: f32 = 2.0;
pub const MIN_LINE_WIDTH: f32 = 1.0;
pub const MAX_LINE_WIDTH: f32 = 10.0;
pub const MAX_COLOR_LEN: usize = 32;
/// Upper bound on one encoded frame, and on what a binary decode may allocate.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Stroke events exchanged through the relay.
///
/// Every `Draw` carries the sender's own color and width, so a receiver never
/// needs to track per-peer tool state.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum DrawMessage {
    #[serde(rename = "drawStart")]
    DrawStart {
        x: f32,
        y: f32,
        color: String,
        #[serde(rename = "lineWidth")]
        line_width: f32,
    },
    #[serde(rename = "draw")]
    Draw {
        x: f32,
        y: f32,
        x2: f32,
        y2: f32,
        color: String,
        #[serde(rename = "lineWidth")]
        line_width: f32,
    },
    #[serde(rename = "drawEnd")]
    DrawEnd,
}

impl DrawMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            DrawMessage::DrawStart { .. } => "drawStart",
            DrawMessage::Draw { .. } => "draw",
            DrawMessage::DrawEnd => "drawEnd",
        }
    }

    pub fn is_well_formed(&self) -> bool {
        match self {
            DrawMessage::DrawStart {
                x,
                y,
                color,
                line_width,
            } => Point::new(*x, *y).is_finite() && color_ok(color) && width_ok(*line_width),
            DrawMessage::Draw {
                x,
                y,
                x2,
                y2,
                color,
                line_width,
            } => {
                Point::new(*x, *y).is_finite()
                    && Point::new(*x2, *y2).is_finite()
                    && color_ok(color)
                    && width_ok(*line_width)
            }
            DrawMessage::DrawEnd => true,
        }
    }
}

fn color_ok(color: &str) -> bool {
    !color.is_empty() && color.len() <= MAX_COLOR_LEN
}

fn width_ok(width: f32) -> bool {
    width.is_finite() && width > 0.0
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// JSON in text frames.
    #[default]
    Json,
    /// bincode in binary frames.
    Binary,
}

impl std::str::FromStr for WireFormat {
    type Err = ProtocolError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "json" => Ok(WireFormat::Json),
            "binary" | "bin" => Ok(WireFormat::Binary),
            other => Err(ProtocolError::UnknownFormat(other.to_string())),
        }
    }
}

pub fn sanitize_color(mut color: String) -> String {
    if color.is_empty() {
        return DEFAULT_COLOR.to_string();
    }
    if color.len() > MAX_COLOR_LEN {
        let mut end = MAX_COLOR_LEN;
        while !color.is_char_boundary(end) {
            end -= 1;
        }
        color.truncate(end);
    }
    color
}

pub fn sanitize_line_width(width: f32) -> f32 {
    let width = if width.is_finite() {
        width
    } else {
        DEFAULT_LINE_WIDTH
    };
    width.clamp(MIN_LINE_WIDTH, MAX_LINE_WIDTH)
}
