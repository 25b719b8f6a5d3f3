use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::ImageFormat;

use crate::error::ClientError;
use crate::surface::{Bitmap, RasterSnapshot};

pub const EXPORT_FILE_NAME: &str = "drawing.png";

pub fn encode_png(snapshot: &RasterSnapshot) -> Result<Vec<u8>, ClientError> {
    let image = Bitmap::from_raw(
        snapshot.width(),
        snapshot.height(),
        snapshot.pixels().to_vec(),
    )
    .ok_or(ClientError::SnapshotSize {
        width: snapshot.width(),
        height: snapshot.height(),
    })?;
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

pub fn decode_image(bytes: &[u8]) -> Result<Bitmap, ClientError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Shrinks `bitmap` to fit inside `width` x `height`, keeping its aspect ratio.
/// Images that already fit are returned unchanged.
pub fn fit_within(bitmap: Bitmap, width: u32, height: u32) -> Bitmap {
    let (bitmap_width, bitmap_height) = bitmap.dimensions();
    if bitmap_width <= width && bitmap_height <= height {
        return bitmap;
    }
    if width == 0 || height == 0 || bitmap_width == 0 || bitmap_height == 0 {
        return Bitmap::new(0, 0);
    }
    let scale = f64::min(
        width as f64 / bitmap_width as f64,
        height as f64 / bitmap_height as f64,
    );
    let target_width = ((bitmap_width as f64 * scale).round() as u32).clamp(1, width);
    let target_height = ((bitmap_height as f64 * scale).round() as u32).clamp(1, height);
    imageops::resize(&bitmap, target_width, target_height, FilterType::Triangle)
}
