//! Software H.264 backend (OpenH264)

use openh264::decoder::Decoder;
use openh264::encoder::{Encoder, EncoderConfig};
use openh264::formats::YUVBuffer;
use openh264::OpenH264API;
use tracing::debug;

use super::codec::{FrameDecoder, FrameEncoder, VideoCodecFactory};
use super::config::VideoCodec;
use crate::error::{AppError, Result};
use crate::video::convert::{rgb_to_bgr, swap_red_blue};
use crate::video::{PackedImage, PixelFormat, Resolution, VideoFrame};

pub struct OpenH264Factory;

impl VideoCodecFactory for OpenH264Factory {
    fn codec(&self) -> VideoCodec {
        VideoCodec::H264
    }

    fn decoder(&self) -> Result<Box<dyn FrameDecoder>> {
        Ok(Box::new(H264Decoder::new()?))
    }

    fn encoder(&self, bitrate_kbps: u32) -> Result<Box<dyn FrameEncoder>> {
        Ok(Box::new(H264Encoder::new(bitrate_kbps)))
    }
}

pub struct H264Decoder {
    decoder: Decoder,
    rgb: Vec<u8>,
}

impl H264Decoder {
    pub fn new() -> Result<Self> {
        let decoder = Decoder::new(OpenH264API::from_source())
            .map_err(|e| AppError::VideoError(format!("Failed to create H.264 decoder: {}", e)))?;
        Ok(Self {
            decoder,
            rgb: Vec::new(),
        })
    }
}

impl FrameDecoder for H264Decoder {
    fn decode(&mut self, access_unit: &[u8]) -> Result<Option<PackedImage>> {
        let decoded = self
            .decoder
            .decode(access_unit)
            .map_err(|e| AppError::VideoError(format!("H.264 decode failed: {}", e)))?;
        let Some(yuv) = decoded else {
            return Ok(None);
        };

        let (w, h) = yuv.dimension_rgb();
        self.rgb.resize(w * h * 3, 0);
        let _ = yuv.write_rgb8(&mut self.rgb);

        rgb_to_bgr(&self.rgb, Resolution::new(w as u32, h as u32)).map(Some)
    }
}

/// Encoder that re-initializes whenever the frame size changes, which
/// happens each time processing is toggled (the border adds 6 pixels).
/// Both re-initialization and keyframe requests start a new IDR.
pub struct H264Encoder {
    bitrate_kbps: u32,
    encoder: Option<(Encoder, Resolution)>,
}

impl H264Encoder {
    pub fn new(bitrate_kbps: u32) -> Self {
        Self {
            bitrate_kbps,
            encoder: None,
        }
    }

    fn encoder_for(&mut self, resolution: Resolution) -> Result<&mut Encoder> {
        let stale = !matches!(&self.encoder, Some((_, r)) if *r == resolution);
        if stale {
            debug!("Configuring H.264 encoder for {}", resolution);
            let config = EncoderConfig::new(resolution.width, resolution.height)
                .set_bitrate_bps(self.bitrate_kbps.saturating_mul(1000));
            let encoder = Encoder::with_config(OpenH264API::from_source(), config)
                .map_err(|e| AppError::VideoError(format!("Failed to create H.264 encoder: {}", e)))?;
            self.encoder = Some((encoder, resolution));
        }
        match self.encoder.as_mut() {
            Some((encoder, _)) => Ok(encoder),
            None => Err(AppError::Internal("encoder missing after init".to_string())),
        }
    }
}

/// OpenH264 needs even dimensions; drop the last row/column when odd
fn even_crop(frame: &VideoFrame) -> (Vec<u8>, Resolution) {
    let w = frame.width() & !1;
    let h = frame.height() & !1;
    if w == frame.width() && h == frame.height() {
        return (frame.data().to_vec(), frame.resolution);
    }
    let src_stride = frame.width() as usize * 3;
    let dst_stride = w as usize * 3;
    let mut out = Vec::with_capacity(dst_stride * h as usize);
    for row in frame.data().chunks_exact(src_stride).take(h as usize) {
        out.extend_from_slice(&row[..dst_stride]);
    }
    (out, Resolution::new(w, h))
}

impl FrameEncoder for H264Encoder {
    fn encode(&mut self, frame: &VideoFrame) -> Result<Vec<u8>> {
        if frame.format != PixelFormat::Bgr24 || !frame.is_well_formed() {
            return Err(AppError::VideoError(format!(
                "cannot encode {} frame of {} bytes at {}",
                frame.format,
                frame.len(),
                frame.resolution
            )));
        }
        let (bgr, resolution) = even_crop(frame);
        if resolution.width == 0 || resolution.height == 0 {
            return Err(AppError::VideoError(format!("frame too small: {}", frame.resolution)));
        }
        let rgb = swap_red_blue(&bgr)?;
        let yuv = YUVBuffer::with_rgb(resolution.width as usize, resolution.height as usize, &rgb);

        let encoder = self.encoder_for(resolution)?;
        let bitstream = encoder
            .encode(&yuv)
            .map_err(|e| AppError::VideoError(format!("H.264 encode failed: {}", e)))?;
        Ok(bitstream.to_vec())
    }

    /// A fresh encoder always opens with an IDR frame
    fn request_keyframe(&mut self) {
        self.encoder = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_crop() {
        let frame = VideoFrame::from_bgr((0..27).collect(), Resolution::new(3, 3));
        let (data, res) = even_crop(&frame);
        assert_eq!(res, Resolution::new(2, 2));
        assert_eq!(data, vec![0, 1, 2, 3, 4, 5, 9, 10, 11, 12, 13, 14]);
    }

    #[test]
    fn test_encode_decode() {
        let factory = OpenH264Factory;
        let mut encoder = factory.encoder(1000).unwrap();
        let mut decoder = factory.decoder().unwrap();

        let frame = VideoFrame::from_bgr(vec![128; 64 * 48 * 3], Resolution::new(64, 48));
        let bitstream = encoder.encode(&frame).unwrap();
        assert!(!bitstream.is_empty());

        let image = decoder.decode(&bitstream).unwrap().unwrap();
        assert_eq!(image.resolution(), Resolution::new(64, 48));
    }
}
