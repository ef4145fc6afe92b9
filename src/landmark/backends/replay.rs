use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::error::{AppError, Result};
use crate::landmark::backend::{DetectorFactory, LandmarkDetector};
use crate::landmark::types::HolisticLandmarks;
use crate::video::PackedImage;

/// Backend that replays a recorded landmark track, one entry per frame,
/// looping at the end. Useful for demos and for exercising the overlay path
/// without a model.
pub struct ReplayDetector {
    track: Arc<Vec<HolisticLandmarks>>,
    cursor: usize,
}

impl ReplayDetector {
    pub fn new(track: Arc<Vec<HolisticLandmarks>>) -> Self {
        Self { track, cursor: 0 }
    }
}

impl LandmarkDetector for ReplayDetector {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn process(&mut self, _image: &PackedImage) -> Result<HolisticLandmarks> {
        if self.track.is_empty() {
            return Ok(HolisticLandmarks::default());
        }
        let result = self.track[self.cursor % self.track.len()].clone();
        self.cursor = (self.cursor + 1) % self.track.len();
        Ok(result)
    }
}

pub struct ReplayDetectorFactory {
    track: Arc<Vec<HolisticLandmarks>>,
}

impl ReplayDetectorFactory {
    pub fn new(track: Vec<HolisticLandmarks>) -> Self {
        Self {
            track: Arc::new(track),
        }
    }

    /// Load a track from a JSON array of landmark results
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let track: Vec<HolisticLandmarks> = serde_json::from_str(&text).map_err(|e| {
            AppError::Config(format!("Invalid landmark track {}: {}", path.display(), e))
        })?;
        info!("Loaded {} replay landmark frames from {}", track.len(), path.display());
        Ok(Self::new(track))
    }
}

impl DetectorFactory for ReplayDetectorFactory {
    fn backend(&self) -> &'static str {
        "replay"
    }

    fn create(&self) -> Result<Box<dyn LandmarkDetector>> {
        Ok(Box::new(ReplayDetector::new(self.track.clone())))
    }
}
