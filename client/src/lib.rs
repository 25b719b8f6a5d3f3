//! Browser client core for inkwire: a shared drawing surface with local
//! snapshot undo/redo and a best-effort stroke relay.
//!
//! Everything outside the `wasm32` gate is platform neutral and tested natively.

mod board;
mod color;
mod config;
mod connection;
mod error;
mod export;
mod history;
mod net;
mod render;
mod state;
mod surface;
mod sync;

#[cfg(target_arch = "wasm32")]
mod app;
#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod ws;

pub use board::Board;
pub use color::parse_css_color;
pub use config::{BackoffConfig, BoardConfig};
pub use connection::{Connection, ConnectionAction, ConnectionEvent, ConnectionState};
pub use error::ClientError;
pub use export::{decode_image, encode_png, fit_within, EXPORT_FILE_NAME};
pub use history::{History, Outcome};
pub use net::{session_id_from_path, websocket_url};
pub use render::PixelBuffer;
pub use state::{PointerSession, StrokeMode, ToolState};
pub use surface::{Bitmap, RasterSnapshot, RasterSurface, StrokeSegment};
pub use sync::{apply_remote, SendStatus, SyncClient, Transport, WireFrame};

#[cfg(target_arch = "wasm32")]
pub use app::run;
