//! Video frame data structures

use bytes::Bytes;
use std::time::Instant;

use super::format::{PixelFormat, Resolution, TimeBase};

/// A raw video frame with timing metadata
///
/// Pixel data is tightly packed (stride == width * bytes_per_pixel).
/// `pts` and `time_base` are carried through the pipeline untouched.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Raw frame data
    data: Bytes,
    /// Frame resolution
    pub resolution: Resolution,
    /// Pixel format
    pub format: PixelFormat,
    /// Presentation timestamp in `time_base` units
    pub pts: Option<i64>,
    /// Unit of `pts`
    pub time_base: TimeBase,
    /// Frame sequence number
    pub sequence: u64,
    /// Timestamp when frame entered the process
    pub capture_ts: Instant,
}

impl VideoFrame {
    /// Create a new video frame
    pub fn new(data: Bytes, resolution: Resolution, format: PixelFormat) -> Self {
        Self {
            data,
            resolution,
            format,
            pts: None,
            time_base: TimeBase::default(),
            sequence: 0,
            capture_ts: Instant::now(),
        }
    }

    /// Create a BGR24 frame from a Vec<u8>
    pub fn from_bgr(data: Vec<u8>, resolution: Resolution) -> Self {
        Self::new(Bytes::from(data), resolution, PixelFormat::Bgr24)
    }

    /// Set presentation timing
    pub fn with_timing(mut self, pts: Option<i64>, time_base: TimeBase) -> Self {
        self.pts = pts;
        self.time_base = time_base;
        self
    }

    /// Set sequence number
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Build a frame carrying new pixels but this frame's timing identity
    pub fn with_pixels(&self, data: Vec<u8>, resolution: Resolution) -> Self {
        Self {
            data: Bytes::from(data),
            resolution,
            format: self.format,
            pts: self.pts,
            time_base: self.time_base,
            sequence: self.sequence,
            capture_ts: self.capture_ts,
        }
    }

    /// Get frame data as bytes slice
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get frame data as Bytes (cheap clone)
    pub fn data_bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// Get data length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if frame is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.resolution.width
    }

    pub fn height(&self) -> u32 {
        self.resolution.height
    }

    /// Whether the buffer length matches resolution and format
    pub fn is_well_formed(&self) -> bool {
        !self.data.is_empty() && self.data.len() == self.format.frame_size(self.resolution)
    }

    /// Get age of this frame (time since capture)
    pub fn age(&self) -> std::time::Duration {
        self.capture_ts.elapsed()
    }
}

/// Frame metadata without actual data (for logging/stats)
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMeta {
    pub resolution: Resolution,
    pub format: PixelFormat,
    pub size: usize,
    pub sequence: u64,
    pub pts: Option<i64>,
}

impl From<&VideoFrame> for FrameMeta {
    fn from(frame: &VideoFrame) -> Self {
        Self {
            resolution: frame.resolution,
            format: frame.format,
            size: frame.len(),
            sequence: frame.sequence,
            pts: frame.pts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_pixels_keeps_timing() {
        let frame = VideoFrame::from_bgr(vec![1; 12], Resolution::new(2, 2))
            .with_timing(Some(4500), TimeBase::new(1, 90_000))
            .with_sequence(7);

        let out = frame.with_pixels(vec![0; 27], Resolution::new(3, 3));
        assert_eq!(out.pts, Some(4500));
        assert_eq!(out.time_base, TimeBase::new(1, 90_000));
        assert_eq!(out.sequence, 7);
        assert_eq!(out.resolution, Resolution::new(3, 3));
        assert!(out.is_well_formed());
    }

    #[test]
    fn test_well_formed() {
        let frame = VideoFrame::from_bgr(vec![0; 11], Resolution::new(2, 2));
        assert!(!frame.is_well_formed());
        let frame = VideoFrame::from_bgr(vec![], Resolution::new(0, 0));
        assert!(!frame.is_well_formed());
    }

    #[test]
    fn test_frame_meta() {
        let frame = VideoFrame::from_bgr(vec![0; 12], Resolution::new(2, 2)).with_timing(Some(1), TimeBase::RTP_VIDEO);
        let meta = FrameMeta::from(&frame);
        assert_eq!(meta.size, 12);
        assert_eq!(meta.pts, Some(1));
    }
}
