//! Pixel format, resolution and time base definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Packed pixel formats handled by the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PixelFormat {
    /// BGR24 format (3 bytes per pixel), the pipeline working order
    Bgr24,
    /// RGB24 format (3 bytes per pixel), the detector input order
    Rgb24,
}

impl PixelFormat {
    /// Get bytes per pixel
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Bgr24 | PixelFormat::Rgb24 => 3,
        }
    }

    /// Calculate expected frame size for a given resolution
    pub fn frame_size(&self, resolution: Resolution) -> usize {
        resolution.pixels() as usize * self.bytes_per_pixel()
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PixelFormat::Bgr24 => "BGR24",
            PixelFormat::Rgb24 => "RGB24",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for PixelFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BGR24" | "BGR3" => Ok(PixelFormat::Bgr24),
            "RGB24" | "RGB3" => Ok(PixelFormat::Rgb24),
            _ => Err(format!("Unknown pixel format: {}", s)),
        }
    }
}

/// Resolution (width x height)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Get total pixels
    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Grow by `pad` pixels on every side
    pub fn padded(&self, pad: u32) -> Self {
        Self {
            width: self.width + 2 * pad,
            height: self.height + 2 * pad,
        }
    }

    pub const VGA: Resolution = Resolution {
        width: 640,
        height: 480,
    };
    pub const HD720: Resolution = Resolution {
        width: 1280,
        height: 720,
    };
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// Rational unit of a presentation timestamp (seconds per tick)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeBase {
    pub num: u32,
    pub den: u32,
}

impl TimeBase {
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// RTP video clock (90 kHz)
    pub const RTP_VIDEO: TimeBase = TimeBase::new(1, 90_000);

    /// Convert a tick count in this time base to a duration
    pub fn to_duration(&self, ticks: i64) -> std::time::Duration {
        if ticks <= 0 || self.den == 0 {
            return std::time::Duration::ZERO;
        }
        let nanos = ticks as u128 * self.num as u128 * 1_000_000_000 / self.den as u128;
        std::time::Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::RTP_VIDEO
    }
}

impl fmt::Display for TimeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size() {
        assert_eq!(PixelFormat::Bgr24.frame_size(Resolution::new(4, 2)), 24);
        assert_eq!(PixelFormat::Rgb24.frame_size(Resolution::VGA), 640 * 480 * 3);
    }

    #[test]
    fn test_pixel_format_parse() {
        assert_eq!("bgr24".parse::<PixelFormat>(), Ok(PixelFormat::Bgr24));
        assert_eq!("RGB3".parse::<PixelFormat>(), Ok(PixelFormat::Rgb24));
        assert!("NV12".parse::<PixelFormat>().is_err());
    }

    #[test]
    fn test_resolution_padded() {
        assert_eq!(Resolution::new(640, 480).padded(3), Resolution::new(646, 486));
    }

    #[test]
    fn test_time_base_duration() {
        let tb = TimeBase::RTP_VIDEO;
        assert_eq!(tb.to_duration(3000), std::time::Duration::from_millis(33) + std::time::Duration::from_nanos(333_333));
        assert_eq!(tb.to_duration(-5), std::time::Duration::ZERO);
        assert_eq!(TimeBase::new(1, 1000).to_duration(40), std::time::Duration::from_millis(40));
    }
}
