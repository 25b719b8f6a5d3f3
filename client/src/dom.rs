use image::imageops;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{Clamped, JsCast};
use web_sys::{
    CanvasRenderingContext2d, Document, Element, HtmlButtonElement, HtmlCanvasElement,
    HtmlInputElement, HtmlSpanElement, ImageData, MouseEvent,
};

use inkwire_shared::Point;

use crate::surface::{Bitmap, RasterSnapshot, RasterSurface, StrokeSegment};

pub fn get_element<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    let element = document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("Missing element: {id}")))?;
    element
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("Invalid element type: {id}")))
}

pub fn update_size_label(input: &HtmlInputElement, value: &HtmlSpanElement) {
    value.set_text_content(Some(&input.value()));
}

pub fn set_tool_button(button: &HtmlButtonElement, active: bool) {
    let pressed = if active { "true" } else { "false" };
    let _ = button.set_attribute("aria-pressed", pressed);
}

pub fn set_status(status_el: &Element, status_text: &Element, state: &str, text: &str) {
    let _ = status_el.set_attribute("data-state", state);
    status_text.set_text_content(Some(text));
}

/// Pointer position in canvas pixels. The canvas may be styled to a
/// different CSS size than its backing store.
pub fn event_to_point(canvas: &HtmlCanvasElement, event: &MouseEvent) -> Point {
    let rect = canvas.get_bounding_client_rect();
    let scale_x = if rect.width() > 0.0 {
        canvas.width() as f64 / rect.width()
    } else {
        1.0
    };
    let scale_y = if rect.height() > 0.0 {
        canvas.height() as f64 / rect.height()
    } else {
        1.0
    };
    Point::new(
        (event.offset_x() as f64 * scale_x) as f32,
        (event.offset_y() as f64 * scale_y) as f32,
    )
}

/// Canvas element used as the drawing surface.
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("Missing 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        let surface = Self { canvas, ctx };
        surface.reset_pen();
        Ok(surface)
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    /// Setting the canvas size resets the context, so this runs after every resize.
    fn reset_pen(&self) {
        self.ctx.set_line_cap("round");
        self.ctx.set_line_join("round");
    }

    fn put_pixels(&self, pixels: &[u8], width: u32, height: u32) {
        match ImageData::new_with_u8_clamped_array_and_sh(Clamped(pixels), width, height) {
            Ok(data) => {
                let _ = self.ctx.put_image_data(&data, 0.0, 0.0);
            }
            Err(error) => log::error!("failed to build image data: {error:?}"),
        }
    }
}

impl RasterSurface for CanvasSurface {
    fn size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn begin_path(&mut self, at: Point) {
        self.ctx.begin_path();
        self.ctx.move_to(at.x as f64, at.y as f64);
    }

    fn stroke_segment(&mut self, segment: &StrokeSegment) {
        self.ctx.set_stroke_style_str(&segment.color);
        self.ctx.set_line_width(segment.width as f64);
        self.ctx.begin_path();
        self.ctx.move_to(segment.from.x as f64, segment.from.y as f64);
        self.ctx.line_to(segment.to.x as f64, segment.to.y as f64);
        self.ctx.stroke();
    }

    fn clear(&mut self) {
        let (width, height) = self.size();
        self.ctx.clear_rect(0.0, 0.0, width as f64, height as f64);
    }

    fn snapshot(&self) -> Option<RasterSnapshot> {
        let (width, height) = self.size();
        if width == 0 || height == 0 {
            return None;
        }
        let data = self
            .ctx
            .get_image_data(0.0, 0.0, width as f64, height as f64)
            .ok()?;
        RasterSnapshot::new(data.width(), data.height(), data.data().0)
    }

    fn restore(&mut self, snapshot: &RasterSnapshot) {
        self.clear();
        self.put_pixels(snapshot.pixels(), snapshot.width(), snapshot.height());
    }

    fn draw_image(&mut self, bitmap: &Bitmap, x: i64, y: i64) {
        let Some(mut current) = self.snapshot().and_then(RasterSnapshot::into_image) else {
            return;
        };
        imageops::overlay(&mut current, bitmap, x, y);
        let (width, height) = current.dimensions();
        self.put_pixels(current.as_raw(), width, height);
    }

    fn resize(&mut self, width: u32, height: u32) {
        let saved = self.snapshot();
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        self.reset_pen();
        if let Some(saved) = saved {
            self.put_pixels(saved.pixels(), saved.width(), saved.height());
        }
    }
}
