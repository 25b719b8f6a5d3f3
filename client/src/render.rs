use image::{imageops, Pixel, Rgba};
use inkwire_shared::Point;

use crate::color::{parse_css_color, BLACK};
use crate::surface::{Bitmap, RasterSnapshot, RasterSurface, StrokeSegment};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// In-memory RGBA surface.
///
/// Segments are drawn with round caps: a pixel is painted when its center lies
/// within half the line width of the segment. No anti-aliasing.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    image: Bitmap,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: Bitmap::from_pixel(width, height, TRANSPARENT),
        }
    }

    pub fn image(&self) -> &Bitmap {
        &self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        if x >= self.image.width() || y >= self.image.height() {
            return None;
        }
        Some(*self.image.get_pixel(x, y))
    }

    pub fn is_painted(&self, x: u32, y: u32) -> bool {
        self.pixel(x, y).is_some_and(|pixel| pixel[3] > 0)
    }

    pub fn painted_count(&self) -> usize {
        self.image.pixels().filter(|pixel| pixel[3] > 0).count()
    }
}

impl RasterSurface for PixelBuffer {
    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn stroke_segment(&mut self, segment: &StrokeSegment) {
        let color = parse_css_color(&segment.color).unwrap_or(BLACK);
        draw_segment(&mut self.image, segment.from, segment.to, segment.width, color);
    }

    fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = TRANSPARENT;
        }
    }

    fn snapshot(&self) -> Option<RasterSnapshot> {
        let (width, height) = self.image.dimensions();
        if width == 0 || height == 0 {
            return None;
        }
        RasterSnapshot::new(width, height, self.image.as_raw().clone())
    }

    fn restore(&mut self, snapshot: &RasterSnapshot) {
        if snapshot.width() == self.image.width() && snapshot.height() == self.image.height() {
            self.image.copy_from_slice(snapshot.pixels());
            return;
        }
        let Some(saved) =
            Bitmap::from_raw(snapshot.width(), snapshot.height(), snapshot.pixels().to_vec())
        else {
            return;
        };
        self.clear();
        imageops::replace(&mut self.image, &saved, 0, 0);
    }

    fn draw_image(&mut self, bitmap: &Bitmap, x: i64, y: i64) {
        imageops::overlay(&mut self.image, bitmap, x, y);
    }

    fn resize(&mut self, width: u32, height: u32) {
        let mut resized = Bitmap::from_pixel(width, height, TRANSPARENT);
        imageops::replace(&mut resized, &self.image, 0, 0);
        self.image = resized;
    }
}

pub fn draw_segment(image: &mut Bitmap, from: Point, to: Point, width: f32, color: Rgba<u8>) {
    let (image_width, image_height) = image.dimensions();
    if image_width == 0 || image_height == 0 {
        return;
    }
    let radius = (width / 2.0).max(0.5);
    let min_x = (from.x.min(to.x) - radius).floor().max(0.0);
    let min_y = (from.y.min(to.y) - radius).floor().max(0.0);
    let max_x = (from.x.max(to.x) + radius).ceil().min(image_width as f32 - 1.0);
    let max_y = (from.y.max(to.y) + radius).ceil().min(image_height as f32 - 1.0);
    if min_x > max_x || min_y > max_y {
        return;
    }

    let radius_sq = radius * radius;
    for y in min_y as u32..=max_y as u32 {
        for x in min_x as u32..=max_x as u32 {
            let center = Point::new(x as f32 + 0.5, y as f32 + 0.5);
            if distance_sq_to_segment(center, from, to) <= radius_sq {
                image.get_pixel_mut(x, y).blend(&color);
            }
        }
    }
}

fn distance_sq_to_segment(point: Point, from: Point, to: Point) -> f32 {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let length_sq = dx * dx + dy * dy;
    let t = if length_sq > 0.0 {
        (((point.x - from.x) * dx + (point.y - from.y) * dy) / length_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let nearest_x = from.x + t * dx;
    let nearest_y = from.y + t * dy;
    let ex = point.x - nearest_x;
    let ey = point.y - nearest_y;
    ex * ex + ey * ey
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(from: (f32, f32), to: (f32, f32), color: &str, width: f32) -> StrokeSegment {
        StrokeSegment {
            from: Point::new(from.0, from.1),
            to: Point::new(to.0, to.1),
            color: color.into(),
            width,
        }
    }

    #[test]
    fn segment_paints_between_endpoints_only() {
        let mut buffer = PixelBuffer::new(40, 40);
        buffer.stroke_segment(&segment((10.0, 10.0), (20.0, 20.0), "#000", 2.0));

        assert!(buffer.is_painted(10, 10));
        assert!(buffer.is_painted(15, 15));
        assert!(buffer.is_painted(20, 20));
        assert!(!buffer.is_painted(5, 5));
        assert!(!buffer.is_painted(25, 25));
        assert!(!buffer.is_painted(20, 10));
        assert_eq!(buffer.pixel(15, 15), Some(BLACK));
    }

    #[test]
    fn zero_length_segment_leaves_round_dot() {
        let mut buffer = PixelBuffer::new(20, 20);
        buffer.stroke_segment(&segment((10.0, 10.0), (10.0, 10.0), "red", 6.0));
        assert!(buffer.is_painted(10, 10));
        assert!(buffer.is_painted(8, 10));
        assert!(!buffer.is_painted(5, 5));
        assert_eq!(buffer.pixel(10, 10), Some(Rgba([255, 0, 0, 255])));
    }

    #[test]
    fn segment_outside_is_clipped() {
        let mut buffer = PixelBuffer::new(10, 10);
        buffer.stroke_segment(&segment((-50.0, -50.0), (-40.0, -40.0), "#000", 4.0));
        buffer.stroke_segment(&segment((5.0, 5.0), (500.0, 5.0), "#000", 2.0));
        assert!(buffer.is_painted(9, 5));
        assert!(!buffer.is_painted(0, 0));
    }

    #[test]
    fn clear_wipes_everything() {
        let mut buffer = PixelBuffer::new(10, 10);
        buffer.stroke_segment(&segment((0.0, 0.0), (9.0, 9.0), "#000", 3.0));
        assert!(buffer.painted_count() > 0);
        buffer.clear();
        assert_eq!(buffer.painted_count(), 0);
    }

    #[test]
    fn restore_returns_exact_pixels() {
        let mut buffer = PixelBuffer::new(16, 16);
        buffer.stroke_segment(&segment((1.0, 1.0), (14.0, 3.0), "#336699", 2.0));
        let saved = buffer.snapshot().unwrap();
        buffer.stroke_segment(&segment((1.0, 10.0), (14.0, 10.0), "#ff0000", 4.0));
        buffer.restore(&saved);
        assert_eq!(buffer.snapshot().unwrap(), saved);
    }

    #[test]
    fn resize_keeps_pixels_at_their_coordinates() {
        let mut buffer = PixelBuffer::new(20, 20);
        buffer.stroke_segment(&segment((2.0, 2.0), (2.0, 2.0), "#000", 2.0));
        buffer.stroke_segment(&segment((15.0, 15.0), (15.0, 15.0), "#000", 2.0));

        buffer.resize(40, 30);
        assert_eq!(buffer.size(), (40, 30));
        assert!(buffer.is_painted(2, 2));
        assert!(buffer.is_painted(15, 15));
        assert!(!buffer.is_painted(30, 25));

        buffer.resize(10, 10);
        assert_eq!(buffer.size(), (10, 10));
        assert!(buffer.is_painted(2, 2));
        assert_eq!(buffer.pixel(15, 15), None);
    }

    #[test]
    fn restoring_smaller_snapshot_clears_the_rest() {
        let mut buffer = PixelBuffer::new(10, 10);
        buffer.stroke_segment(&segment((2.0, 2.0), (2.0, 2.0), "#000", 2.0));
        let saved = buffer.snapshot().unwrap();

        buffer.resize(20, 20);
        buffer.stroke_segment(&segment((15.0, 15.0), (15.0, 15.0), "#000", 2.0));
        buffer.restore(&saved);

        assert_eq!(buffer.size(), (20, 20));
        assert!(buffer.is_painted(2, 2));
        assert!(!buffer.is_painted(15, 15));
    }

    #[test]
    fn empty_buffer_has_no_snapshot() {
        assert!(PixelBuffer::new(0, 0).snapshot().is_none());
    }

    #[test]
    fn draw_image_composites_at_offset() {
        let mut buffer = PixelBuffer::new(10, 10);
        let bitmap = Bitmap::from_pixel(2, 2, Rgba([0, 255, 0, 255]));
        buffer.draw_image(&bitmap, 4, 4);
        assert_eq!(buffer.pixel(4, 4), Some(Rgba([0, 255, 0, 255])));
        assert_eq!(buffer.pixel(5, 5), Some(Rgba([0, 255, 0, 255])));
        assert!(!buffer.is_painted(6, 6));
        assert_eq!(buffer.painted_count(), 4);
    }
}
