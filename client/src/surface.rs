use std::fmt;

use inkwire_shared::{sanitize_color, sanitize_line_width, DrawMessage, Point};

/// Decoded image ready to be composited onto a surface.
pub type Bitmap = image::RgbaImage;

/// One straight line between two consecutive points of a stroke.
#[derive(Clone, Debug, PartialEq)]
pub struct StrokeSegment {
    pub from: Point,
    pub to: Point,
    pub color: String,
    pub width: f32,
}

impl StrokeSegment {
    pub fn to_message(&self) -> DrawMessage {
        DrawMessage::Draw {
            x: self.from.x,
            y: self.from.y,
            x2: self.to.x,
            y2: self.to.y,
            color: self.color.clone(),
            line_width: self.width,
        }
    }

    /// Builds the segment a remote `draw` message describes, using the sender's
    /// own color and width.
    pub fn from_message(message: &DrawMessage) -> Option<Self> {
        let DrawMessage::Draw {
            x,
            y,
            x2,
            y2,
            color,
            line_width,
        } = message
        else {
            return None;
        };
        let from = Point::new(*x, *y);
        let to = Point::new(*x2, *y2);
        if !from.is_finite() || !to.is_finite() {
            return None;
        }
        Some(Self {
            from,
            to,
            color: sanitize_color(color.clone()),
            width: sanitize_line_width(*line_width),
        })
    }
}

/// Full RGBA copy of a surface at one instant.
///
/// Not `Clone`: a snapshot lives on exactly one history stack.
#[derive(PartialEq, Eq)]
pub struct RasterSnapshot {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterSnapshot {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        if pixels.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }

    pub fn into_image(self) -> Option<Bitmap> {
        Bitmap::from_raw(self.width, self.height, self.pixels)
    }
}

impl fmt::Debug for RasterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterSnapshot")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// The 2D pixel target the board draws on.
///
/// `snapshot` returns `None` while the surface has no backing pixels yet; callers
/// treat that as "not ready" and do nothing.
pub trait RasterSurface {
    fn size(&self) -> (u32, u32);

    /// Starts a fresh path at `at`. Nothing becomes visible until a segment is stroked.
    fn begin_path(&mut self, _at: Point) {}

    fn stroke_segment(&mut self, segment: &StrokeSegment);

    fn clear(&mut self);

    fn snapshot(&self) -> Option<RasterSnapshot>;

    /// Replaces the visible pixels with the snapshot: the surface is cleared,
    /// then the snapshot is written at the origin, clipped to the current size.
    fn restore(&mut self, snapshot: &RasterSnapshot);

    fn draw_image(&mut self, bitmap: &Bitmap, x: i64, y: i64);

    /// Changes the pixel size, keeping existing pixels at their coordinates.
    fn resize(&mut self, width: u32, height: u32);
}
