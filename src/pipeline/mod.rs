//! Frame pipeline: annotation stage and per-session processing loop

pub mod annotate;
pub mod draw;
pub mod mode;
pub mod processor;
pub mod source;

pub use annotate::{annotate, annotate_image, BORDER_COLOR, BORDER_SIZE};
pub use mode::RenderMode;
pub use processor::{FramePipeline, PipelineStats};
pub use source::{ChannelFrameSource, FrameSource};
