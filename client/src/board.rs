use inkwire_shared::{DrawMessage, Point};

use crate::config::BoardConfig;
use crate::connection::{ConnectionAction, ConnectionEvent};
use crate::error::ClientError;
use crate::export::{decode_image, encode_png, fit_within};
use crate::history::{History, Outcome};
use crate::state::{PointerSession, StrokeMode, ToolState};
use crate::surface::{Bitmap, RasterSurface};
use crate::sync::{apply_remote, SyncClient, Transport, WireFrame};

/// Local input controller: turns pointer and toolbar actions into surface
/// drawing, history captures and outbound sync messages.
///
/// All methods run on the single UI thread, one event at a time.
pub struct Board<S: RasterSurface, T: Transport> {
    surface: Option<S>,
    history: History,
    tool: ToolState,
    mode: StrokeMode,
    sync: SyncClient<T>,
    pending_resize: Option<(u32, u32)>,
}

impl<S: RasterSurface, T: Transport> Board<S, T> {
    pub fn new(config: &BoardConfig, transport: T) -> Self {
        Self {
            surface: None,
            history: History::with_capacity_limit(config.history_capacity),
            tool: ToolState::new(&config.background_color),
            mode: StrokeMode::Idle,
            sync: SyncClient::new(transport, config.wire_format, config.reconnect.clone()),
            pending_resize: None,
        }
    }

    /// Attaches the surface and asks for a relay connection.
    pub fn mount(&mut self, surface: S) -> ConnectionAction {
        self.surface = Some(surface);
        self.sync.handle_connection_event(ConnectionEvent::Start)
    }

    /// Detaches the surface and tears the connection down.
    pub fn unmount(&mut self) -> Option<S> {
        self.mode = StrokeMode::Idle;
        self.pending_resize = None;
        self.sync.handle_connection_event(ConnectionEvent::Shutdown);
        self.surface.take()
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn tool(&self) -> &ToolState {
        &self.tool
    }

    pub fn sync(&self) -> &SyncClient<T> {
        &self.sync
    }

    pub fn is_drawing(&self) -> bool {
        self.mode.is_drawing()
    }

    pub fn set_color(&mut self, color: &str) {
        self.tool.set_color(color);
    }

    pub fn set_line_width(&mut self, width: u8) {
        self.tool.set_line_width(width);
    }

    pub fn set_eraser(&mut self, eraser: bool) {
        self.tool.set_eraser(eraser);
    }

    pub fn toggle_eraser(&mut self) -> bool {
        self.tool.toggle_eraser()
    }

    pub fn pointer_down(&mut self, at: Point) -> Outcome {
        if self.mode.is_drawing() || !at.is_finite() {
            return Outcome::Ignored;
        }
        let Some(surface) = self.surface.as_mut() else {
            return Outcome::NotReady;
        };
        if self.history.capture_before_action(surface) == Outcome::NotReady {
            return Outcome::NotReady;
        }
        surface.begin_path(at);
        self.mode = StrokeMode::Drawing(PointerSession::start(at));
        let color = self.tool.stroke_color().to_string();
        let width = f32::from(self.tool.line_width());
        self.sync.send_start(at, &color, width);
        Outcome::Applied
    }

    pub fn pointer_move(&mut self, to: Point) -> Outcome {
        let StrokeMode::Drawing(session) = &mut self.mode else {
            return Outcome::Ignored;
        };
        if !to.is_finite() {
            return Outcome::Ignored;
        }
        let Some(surface) = self.surface.as_mut() else {
            return Outcome::NotReady;
        };
        let segment = self.tool.segment(session.last, to);
        surface.stroke_segment(&segment);
        session.last = to;
        session.segments += 1;
        self.sync.send_segment(&segment);
        Outcome::Applied
    }

    pub fn pointer_up(&mut self) -> Outcome {
        let StrokeMode::Drawing(session) = self.mode else {
            return Outcome::Ignored;
        };
        self.mode = StrokeMode::Idle;
        log::debug!(
            "stroke from ({}, {}) ended after {} segments",
            session.origin.x,
            session.origin.y,
            session.segments
        );
        self.sync.send_end();
        if let Some((width, height)) = self.pending_resize.take() {
            self.apply_resize(width, height);
        }
        Outcome::Applied
    }

    pub fn pointer_leave(&mut self) -> Outcome {
        self.pointer_up()
    }

    /// Wipes the surface. Peers are not told.
    pub fn clear(&mut self) -> Outcome {
        if self.mode.is_drawing() {
            return Outcome::Ignored;
        }
        let Some(surface) = self.surface.as_mut() else {
            return Outcome::NotReady;
        };
        if self.history.capture_before_action(surface) == Outcome::NotReady {
            return Outcome::NotReady;
        }
        surface.clear();
        Outcome::Applied
    }

    /// History actions never run mid-stroke: the stroke's own snapshot is
    /// still at the top of the undo stack.
    pub fn undo(&mut self) -> Outcome {
        if self.mode.is_drawing() {
            return Outcome::Ignored;
        }
        match self.surface.as_mut() {
            Some(surface) => self.history.undo(surface),
            None => Outcome::NotReady,
        }
    }

    pub fn redo(&mut self) -> Outcome {
        if self.mode.is_drawing() {
            return Outcome::Ignored;
        }
        match self.surface.as_mut() {
            Some(surface) => self.history.redo(surface),
            None => Outcome::NotReady,
        }
    }

    /// Composites `bitmap` at the origin, shrunk to fit the surface.
    pub fn insert_image(&mut self, bitmap: Bitmap) -> Outcome {
        if self.mode.is_drawing() {
            return Outcome::Ignored;
        }
        let Some(surface) = self.surface.as_mut() else {
            return Outcome::NotReady;
        };
        if self.history.capture_before_action(surface) == Outcome::NotReady {
            return Outcome::NotReady;
        }
        let (width, height) = surface.size();
        let fitted = fit_within(bitmap, width, height);
        surface.draw_image(&fitted, 0, 0);
        Outcome::Applied
    }

    pub fn insert_image_bytes(&mut self, bytes: &[u8]) -> Result<Outcome, ClientError> {
        if self.surface.is_none() {
            return Ok(Outcome::NotReady);
        }
        if self.mode.is_drawing() {
            return Ok(Outcome::Ignored);
        }
        let bitmap = decode_image(bytes)?;
        Ok(self.insert_image(bitmap))
    }

    /// PNG encoding of the visible pixels, `None` while not ready.
    pub fn export_png(&self) -> Result<Option<Vec<u8>>, ClientError> {
        let Some(snapshot) = self.surface.as_ref().and_then(|surface| surface.snapshot()) else {
            return Ok(None);
        };
        encode_png(&snapshot).map(Some)
    }

    /// Resizes now, or once the active stroke ends.
    pub fn request_resize(&mut self, width: u32, height: u32) -> Outcome {
        if self.surface.is_none() {
            return Outcome::NotReady;
        }
        if self.mode.is_drawing() {
            self.pending_resize = Some((width, height));
            return Outcome::Deferred;
        }
        self.apply_resize(width, height);
        Outcome::Applied
    }

    pub fn handle_remote(&mut self, message: &DrawMessage) -> Outcome {
        let Some(surface) = self.surface.as_mut() else {
            return Outcome::NotReady;
        };
        if apply_remote(surface, message) {
            Outcome::Applied
        } else {
            Outcome::Ignored
        }
    }

    pub fn handle_frame(&mut self, frame: &WireFrame) -> Result<Outcome, ClientError> {
        let message = frame.decode()?;
        Ok(self.handle_remote(&message))
    }

    pub fn handle_connection_event(&mut self, event: ConnectionEvent) -> ConnectionAction {
        self.sync.handle_connection_event(event)
    }

    fn apply_resize(&mut self, width: u32, height: u32) {
        if let Some(surface) = self.surface.as_mut() {
            if surface.size() != (width, height) {
                log::debug!("resizing surface to {width}x{height}");
                surface.resize(width, height);
            }
        }
    }
}
