use crate::error::Result;
use crate::landmark::backend::{DetectorFactory, DetectorOptions, LandmarkDetector};
use crate::landmark::types::HolisticLandmarks;
use crate::video::PackedImage;

/// Backend that never reports landmarks. Frames still get the border and,
/// in isolated mode, a blank canvas.
pub struct NoneDetector {
    frames: u64,
}

impl NoneDetector {
    pub fn new() -> Self {
        Self { frames: 0 }
    }

    /// Number of frames processed by this instance
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for NoneDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LandmarkDetector for NoneDetector {
    fn name(&self) -> &'static str {
        "none"
    }

    fn process(&mut self, _image: &PackedImage) -> Result<HolisticLandmarks> {
        self.frames += 1;
        Ok(HolisticLandmarks::default())
    }
}

pub struct NoneDetectorFactory {
    _options: DetectorOptions,
}

impl NoneDetectorFactory {
    pub fn new(options: DetectorOptions) -> Self {
        Self { _options: options }
    }
}

impl DetectorFactory for NoneDetectorFactory {
    fn backend(&self) -> &'static str {
        "none"
    }

    fn create(&self) -> Result<Box<dyn LandmarkDetector>> {
        Ok(Box::new(NoneDetector::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::{PixelFormat, Resolution};

    #[test]
    fn test_none_detector_reports_nothing() {
        let mut detector = NoneDetector::new();
        let image = PackedImage::zeroed(Resolution::new(4, 4), PixelFormat::Rgb24);
        let result = detector.process(&image).unwrap();
        assert!(result.is_empty());
        assert_eq!(detector.frames(), 1);
    }

    #[test]
    fn test_factory_builds_independent_instances() {
        let factory = NoneDetectorFactory::new(DetectorOptions::default());
        let mut a = factory.create().unwrap();
        let b = factory.create().unwrap();
        let image = PackedImage::zeroed(Resolution::new(1, 1), PixelFormat::Rgb24);
        a.process(&image).unwrap();
        assert_eq!(a.name(), "none");
        assert_eq!(b.name(), "none");
    }
}
