//! Pixel format conversion utilities
//!
//! The pipeline works in BGR24; the detector consumes RGB24. Both are packed
//! 3-byte formats stored in an `image::ImageBuffer`, so conversion is a
//! per-pixel channel swap.

use image::{imageops, ImageBuffer, Rgb};

use crate::error::{AppError, Result};
use crate::video::format::{PixelFormat, Resolution};

/// Packed 3-channel raster. `Rgb<u8>` is only the storage layout; the
/// actual channel order is carried in `format`.
pub type Canvas = ImageBuffer<Rgb<u8>, Vec<u8>>;

/// Canvas tagged with its channel order
#[derive(Debug, Clone, PartialEq)]
pub struct PackedImage {
    buffer: Canvas,
    format: PixelFormat,
}

impl PackedImage {
    /// Wrap an existing buffer, validating its length
    pub fn from_vec(data: Vec<u8>, resolution: Resolution, format: PixelFormat) -> Result<Self> {
        let expected = format.frame_size(resolution);
        if data.len() != expected {
            return Err(AppError::VideoError(format!(
                "{} buffer for {} has {} bytes, expected {}",
                format,
                resolution,
                data.len(),
                expected
            )));
        }
        let buffer = Canvas::from_raw(resolution.width, resolution.height, data)
            .ok_or_else(|| AppError::VideoError(format!("cannot wrap {} buffer for {}", format, resolution)))?;
        Ok(Self { buffer, format })
    }

    /// Zero-filled image
    pub fn zeroed(resolution: Resolution, format: PixelFormat) -> Self {
        Self {
            buffer: Canvas::new(resolution.width, resolution.height),
            format,
        }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.buffer.width(), self.buffer.height())
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.buffer
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buffer.into_raw()
    }

    /// Read one pixel, `None` when out of bounds
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        self.buffer.get_pixel_checked(x, y).map(|p| p.0)
    }
}

/// Swap the first and third channel of every pixel (BGR <-> RGB)
pub fn swap_red_blue(src: &[u8]) -> Result<Vec<u8>> {
    if src.len() % 3 != 0 {
        return Err(AppError::VideoError(format!(
            "packed 24-bit buffer length {} is not a multiple of 3",
            src.len()
        )));
    }
    let mut out = src.to_vec();
    for px in out.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
    Ok(out)
}

/// Convert a BGR24 image to RGB24
pub fn bgr_to_rgb(image: &PackedImage) -> Result<PackedImage> {
    if image.format != PixelFormat::Bgr24 {
        return Err(AppError::VideoError(format!(
            "expected BGR24 input, got {}",
            image.format
        )));
    }
    let mut buffer = image.buffer.clone();
    for px in buffer.pixels_mut() {
        px.0.swap(0, 2);
    }
    Ok(PackedImage {
        buffer,
        format: PixelFormat::Rgb24,
    })
}

/// Convert an RGB24 buffer to BGR24
pub fn rgb_to_bgr(data: &[u8], resolution: Resolution) -> Result<PackedImage> {
    let data = swap_red_blue(data)?;
    PackedImage::from_vec(data, resolution, PixelFormat::Bgr24)
}

/// Surround an image with a constant-colour border of `size` pixels per side
pub fn copy_make_border(image: &PackedImage, size: u32, color: [u8; 3]) -> PackedImage {
    let out_res = image.resolution().padded(size);
    let mut buffer = Canvas::from_pixel(out_res.width, out_res.height, Rgb(color));
    imageops::replace(&mut buffer, &image.buffer, size as i64, size as i64);
    PackedImage {
        buffer,
        format: image.format,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bgr_to_rgb() {
        let img = PackedImage::from_vec(vec![1, 2, 3, 4, 5, 6], Resolution::new(2, 1), PixelFormat::Bgr24).unwrap();
        let rgb = bgr_to_rgb(&img).unwrap();
        assert_eq!(rgb.as_bytes(), &[3, 2, 1, 6, 5, 4]);
        assert_eq!(rgb.format(), PixelFormat::Rgb24);

        // RGB input is rejected
        assert!(bgr_to_rgb(&rgb).is_err());
    }

    #[test]
    fn test_from_vec_length_check() {
        assert!(PackedImage::from_vec(vec![0; 5], Resolution::new(2, 1), PixelFormat::Bgr24).is_err());
        assert!(PackedImage::from_vec(vec![0; 9], Resolution::new(2, 1), PixelFormat::Bgr24).is_err());
    }

    #[test]
    fn test_copy_make_border() {
        let img = PackedImage::from_vec(vec![9; 2 * 2 * 3], Resolution::new(2, 2), PixelFormat::Bgr24).unwrap();
        let out = copy_make_border(&img, 3, [0, 255, 0]);
        assert_eq!(out.resolution(), Resolution::new(8, 8));
        assert_eq!(out.pixel(0, 0), Some([0, 255, 0]));
        assert_eq!(out.pixel(2, 2), Some([0, 255, 0]));
        assert_eq!(out.pixel(3, 3), Some([9, 9, 9]));
        assert_eq!(out.pixel(4, 4), Some([9, 9, 9]));
        assert_eq!(out.pixel(5, 5), Some([0, 255, 0]));
        assert_eq!(out.pixel(7, 7), Some([0, 255, 0]));
        assert_eq!(out.pixel(8, 0), None);
    }

    #[test]
    fn test_swap_red_blue_rejects_partial_pixels() {
        assert_eq!(swap_red_blue(&[1, 2, 3]).unwrap(), vec![3, 2, 1]);
        assert!(swap_red_blue(&[1, 2]).is_err());
    }
}
