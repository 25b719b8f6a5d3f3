use std::collections::VecDeque;

use crate::surface::{RasterSnapshot, RasterSurface};

/// What a board or history operation did.
///
/// Nothing here is an error: every case leaves the surface in a consistent
/// state, the variant only tells the caller why it may be unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The surface is not mounted or has no pixels yet.
    NotReady,
    /// Undo or redo with nothing on the corresponding stack.
    EmptyStack,
    /// An input event that does not apply in the current state, such as a
    /// pointer move outside a stroke.
    Ignored,
    /// Accepted, but postponed until the active stroke ends.
    Deferred,
}

/// Linear undo/redo over full-surface snapshots.
///
/// `undo` holds the most recent snapshot at the back. `redo` holds the next
/// available snapshot at the front.
#[derive(Debug, Default)]
pub struct History {
    undo: VecDeque<RasterSnapshot>,
    redo: VecDeque<RasterSnapshot>,
    capacity: Option<usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps at most `capacity` undo snapshots, evicting the oldest first.
    /// `None` keeps everything.
    pub fn with_capacity_limit(capacity: Option<usize>) -> Self {
        Self {
            capacity: capacity.map(|capacity| capacity.max(1)),
            ..Self::default()
        }
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Bytes held by both stacks.
    pub fn retained_bytes(&self) -> usize {
        self.undo
            .iter()
            .chain(self.redo.iter())
            .map(RasterSnapshot::byte_len)
            .sum()
    }

    /// Records the current pixels ahead of a drawing, clearing or image action.
    /// Any redo history is discarded.
    pub fn capture_before_action<S: RasterSurface + ?Sized>(&mut self, surface: &S) -> Outcome {
        let Some(snapshot) = surface.snapshot() else {
            return Outcome::NotReady;
        };
        self.push_undo(snapshot);
        self.redo.clear();
        Outcome::Applied
    }

    pub fn undo<S: RasterSurface + ?Sized>(&mut self, surface: &mut S) -> Outcome {
        if self.undo.is_empty() {
            return Outcome::EmptyStack;
        }
        let Some(current) = surface.snapshot() else {
            return Outcome::NotReady;
        };
        let Some(previous) = self.undo.pop_back() else {
            return Outcome::EmptyStack;
        };
        surface.restore(&previous);
        self.redo.push_front(current);
        log::debug!(
            "undo: {} left, {} redoable",
            self.undo.len(),
            self.redo.len()
        );
        Outcome::Applied
    }

    pub fn redo<S: RasterSurface + ?Sized>(&mut self, surface: &mut S) -> Outcome {
        if self.redo.is_empty() {
            return Outcome::EmptyStack;
        }
        let Some(current) = surface.snapshot() else {
            return Outcome::NotReady;
        };
        let Some(next) = self.redo.pop_front() else {
            return Outcome::EmptyStack;
        };
        surface.restore(&next);
        self.push_undo(current);
        log::debug!(
            "redo: {} undoable, {} left",
            self.undo.len(),
            self.redo.len()
        );
        Outcome::Applied
    }

    fn push_undo(&mut self, snapshot: RasterSnapshot) {
        self.undo.push_back(snapshot);
        if let Some(capacity) = self.capacity {
            while self.undo.len() > capacity {
                self.undo.pop_front();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use inkwire_shared::Point;

    use super::*;
    use crate::render::PixelBuffer;
    use crate::surface::StrokeSegment;

    fn line(buffer: &mut PixelBuffer, y: f32) {
        buffer.stroke_segment(&StrokeSegment {
            from: Point::new(1.0, y),
            to: Point::new(30.0, y),
            color: "#000".into(),
            width: 2.0,
        });
    }

    fn draw_with_capture(history: &mut History, buffer: &mut PixelBuffer, y: f32) {
        assert_eq!(history.capture_before_action(buffer), Outcome::Applied);
        line(buffer, y);
    }

    #[test]
    fn undo_n_times_returns_to_initial_and_redo_n_times_returns_to_final() {
        let mut buffer = PixelBuffer::new(32, 32);
        let mut history = History::new();
        let initial = buffer.snapshot().unwrap();

        for y in [4.0, 10.0, 16.0, 22.0] {
            draw_with_capture(&mut history, &mut buffer, y);
        }
        history.capture_before_action(&buffer);
        buffer.clear();
        let last = buffer.snapshot().unwrap();

        for _ in 0..5 {
            assert_eq!(history.undo(&mut buffer), Outcome::Applied);
        }
        assert_eq!(buffer.snapshot().unwrap(), initial);
        assert_eq!(history.undo(&mut buffer), Outcome::EmptyStack);

        for _ in 0..5 {
            assert_eq!(history.redo(&mut buffer), Outcome::Applied);
        }
        assert_eq!(buffer.snapshot().unwrap(), last);
        assert_eq!(history.redo(&mut buffer), Outcome::EmptyStack);
    }

    #[test]
    fn undo_then_redo_restores_state_before_undo() {
        let mut buffer = PixelBuffer::new(32, 32);
        let mut history = History::new();
        draw_with_capture(&mut history, &mut buffer, 5.0);
        draw_with_capture(&mut history, &mut buffer, 9.0);
        let before = buffer.snapshot().unwrap();

        history.undo(&mut buffer);
        assert_ne!(buffer.snapshot().unwrap(), before);
        history.redo(&mut buffer);
        assert_eq!(buffer.snapshot().unwrap(), before);
    }

    #[test]
    fn new_capture_after_undo_discards_redo() {
        let mut buffer = PixelBuffer::new(32, 32);
        let mut history = History::new();
        draw_with_capture(&mut history, &mut buffer, 5.0);
        history.undo(&mut buffer);
        assert!(history.can_redo());

        draw_with_capture(&mut history, &mut buffer, 12.0);
        assert_eq!(history.redo_len(), 0);
        let current = buffer.snapshot().unwrap();
        assert_eq!(history.redo(&mut buffer), Outcome::EmptyStack);
        assert_eq!(buffer.snapshot().unwrap(), current);
    }

    #[test]
    fn empty_stacks_leave_buffer_untouched() {
        let mut buffer = PixelBuffer::new(8, 8);
        line(&mut buffer, 4.0);
        let current = buffer.snapshot().unwrap();
        let mut history = History::new();

        assert_eq!(history.undo(&mut buffer), Outcome::EmptyStack);
        assert_eq!(history.redo(&mut buffer), Outcome::EmptyStack);
        assert_eq!(buffer.snapshot().unwrap(), current);
    }

    #[test]
    fn surface_without_pixels_is_not_ready() {
        let mut buffer = PixelBuffer::new(0, 0);
        let mut history = History::new();
        assert_eq!(history.capture_before_action(&buffer), Outcome::NotReady);
        assert_eq!(history.undo_len(), 0);
        assert_eq!(history.undo(&mut buffer), Outcome::EmptyStack);
    }

    #[test]
    fn capacity_evicts_oldest_snapshot() {
        let mut buffer = PixelBuffer::new(32, 32);
        let mut history = History::with_capacity_limit(Some(2));
        for y in [4.0, 10.0, 16.0] {
            draw_with_capture(&mut history, &mut buffer, y);
        }
        assert_eq!(history.undo_len(), 2);

        assert_eq!(history.undo(&mut buffer), Outcome::Applied);
        assert_eq!(history.undo(&mut buffer), Outcome::Applied);
        assert_eq!(history.undo(&mut buffer), Outcome::EmptyStack);
        // The first line was drawn before the oldest surviving snapshot.
        assert!(buffer.is_painted(10, 4));
        assert!(!buffer.is_painted(10, 10));
    }

    #[test]
    fn retained_bytes_tracks_both_stacks() {
        let mut buffer = PixelBuffer::new(4, 4);
        let mut history = History::new();
        history.capture_before_action(&buffer);
        history.capture_before_action(&buffer);
        history.undo(&mut buffer);
        assert_eq!(history.retained_bytes(), 2 * 4 * 4 * 4);
    }
}
