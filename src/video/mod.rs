//! Raw video frame types and pixel conversions

pub mod convert;
pub mod format;
pub mod frame;

pub use convert::{Canvas, PackedImage};
pub use format::{PixelFormat, Resolution, TimeBase};
pub use frame::{FrameMeta, VideoFrame};
