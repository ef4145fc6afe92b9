//! Video codec seam between RTP and raw BGR frames

use std::sync::Arc;

use super::config::VideoCodec;
use crate::error::Result;
use crate::video::{PackedImage, VideoFrame};

/// Decodes depacketized access units into BGR24 images
pub trait FrameDecoder: Send {
    /// `Ok(None)` when the unit produced no picture (e.g. parameter sets only)
    fn decode(&mut self, access_unit: &[u8]) -> Result<Option<PackedImage>>;
}

/// Encodes BGR24 frames into access units ready for payloading
pub trait FrameEncoder: Send {
    fn encode(&mut self, frame: &VideoFrame) -> Result<Vec<u8>>;

    /// Make the next encoded frame a keyframe
    fn request_keyframe(&mut self) {}
}

/// Builds codec instances for one session
pub trait VideoCodecFactory: Send + Sync {
    fn codec(&self) -> VideoCodec;

    fn decoder(&self) -> Result<Box<dyn FrameDecoder>>;

    fn encoder(&self, bitrate_kbps: u32) -> Result<Box<dyn FrameEncoder>>;
}

pub type SharedCodecFactory = Arc<dyn VideoCodecFactory>;

/// Built-in codec backend for `codec`, if one was compiled in.
///
/// The `h264` feature is on by default; builds without it cannot answer
/// offers.
pub fn default_codec_factory(codec: VideoCodec) -> Option<SharedCodecFactory> {
    match codec {
        VideoCodec::H264 => h264_factory(),
    }
}

#[cfg(feature = "h264")]
fn h264_factory() -> Option<SharedCodecFactory> {
    Some(Arc::new(super::h264::OpenH264Factory))
}

#[cfg(not(feature = "h264"))]
fn h264_factory() -> Option<SharedCodecFactory> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "h264")]
    #[test]
    fn test_default_build_has_h264_backend() {
        let factory = default_codec_factory(VideoCodec::H264).unwrap();
        assert_eq!(factory.codec(), VideoCodec::H264);
    }

    #[cfg(not(feature = "h264"))]
    #[test]
    fn test_no_backend_without_h264_feature() {
        assert!(default_codec_factory(VideoCodec::H264).is_none());
    }
}
