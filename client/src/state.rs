use inkwire_shared::{sanitize_color, Point, DEFAULT_COLOR};

use crate::surface::StrokeSegment;

pub const DEFAULT_BACKGROUND: &str = "#ffffff";
pub const DEFAULT_LINE_WIDTH: u8 = 2;
pub const MIN_LINE_WIDTH: u8 = 1;
pub const MAX_LINE_WIDTH: u8 = 10;

/// Brush settings read by every local draw operation.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolState {
    color: String,
    line_width: u8,
    eraser: bool,
    background: String,
}

impl Default for ToolState {
    fn default() -> Self {
        Self::new(DEFAULT_BACKGROUND)
    }
}

impl ToolState {
    pub fn new(background: &str) -> Self {
        Self {
            color: DEFAULT_COLOR.to_string(),
            line_width: DEFAULT_LINE_WIDTH,
            eraser: false,
            background: sanitize_color(background.to_string()),
        }
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn line_width(&self) -> u8 {
        self.line_width
    }

    pub fn eraser(&self) -> bool {
        self.eraser
    }

    pub fn background(&self) -> &str {
        &self.background
    }

    pub fn set_color(&mut self, color: &str) {
        self.color = sanitize_color(color.trim().to_string());
    }

    pub fn set_line_width(&mut self, width: u8) {
        self.line_width = width.clamp(MIN_LINE_WIDTH, MAX_LINE_WIDTH);
    }

    pub fn set_eraser(&mut self, eraser: bool) {
        self.eraser = eraser;
    }

    pub fn toggle_eraser(&mut self) -> bool {
        self.eraser = !self.eraser;
        self.eraser
    }

    /// The color strokes are drawn with: the background while erasing.
    pub fn stroke_color(&self) -> &str {
        if self.eraser {
            &self.background
        } else {
            &self.color
        }
    }

    pub fn segment(&self, from: Point, to: Point) -> StrokeSegment {
        StrokeSegment {
            from,
            to,
            color: self.stroke_color().to_string(),
            width: f32::from(self.line_width),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerSession {
    pub origin: Point,
    pub last: Point,
    pub segments: usize,
}

impl PointerSession {
    pub fn start(at: Point) -> Self {
        Self {
            origin: at,
            last: at,
            segments: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum StrokeMode {
    #[default]
    Idle,
    Drawing(PointerSession),
}

impl StrokeMode {
    pub fn is_drawing(&self) -> bool {
        matches!(self, StrokeMode::Drawing(_))
    }
}
