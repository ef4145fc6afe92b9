use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::types::HolisticLandmarks;
use crate::error::Result;
use crate::video::PackedImage;

/// Options forwarded to detector backends when a session's instance is built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorOptions {
    /// Model complexity (0, 1 or 2)
    pub model_complexity: u8,
    /// Smooth landmarks across frames
    pub smooth_landmarks: bool,
    /// Refine lip/eye landmarks on the face mesh
    pub refine_face_landmarks: bool,
    /// Minimum confidence for a fresh detection
    pub min_detection_confidence: f32,
    /// Minimum confidence to keep tracking between frames
    pub min_tracking_confidence: f32,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            model_complexity: 1,
            smooth_landmarks: true,
            refine_face_landmarks: true,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

/// Landmark detector backend.
///
/// One instance serves exactly one video stream. Implementations may keep
/// tracking state between calls and therefore assume frames arrive in order
/// from a single source; never share an instance between sessions.
pub trait LandmarkDetector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on an RGB24 image.
    fn process(&mut self, image: &PackedImage) -> Result<HolisticLandmarks>;
}

/// Builds a fresh detector for each new session
pub trait DetectorFactory: Send + Sync {
    /// Backend identifier of the detectors this factory builds
    fn backend(&self) -> &'static str;

    fn create(&self) -> Result<Box<dyn LandmarkDetector>>;
}

/// Factory from a closure, handy for embedding custom backends
pub struct FnDetectorFactory<F> {
    backend: &'static str,
    build: F,
}

impl<F> FnDetectorFactory<F>
where
    F: Fn() -> Result<Box<dyn LandmarkDetector>> + Send + Sync,
{
    pub fn new(backend: &'static str, build: F) -> Self {
        Self { backend, build }
    }
}

impl<F> DetectorFactory for FnDetectorFactory<F>
where
    F: Fn() -> Result<Box<dyn LandmarkDetector>> + Send + Sync,
{
    fn backend(&self) -> &'static str {
        self.backend
    }

    fn create(&self) -> Result<Box<dyn LandmarkDetector>> {
        (self.build)()
    }
}

pub type SharedDetectorFactory = Arc<dyn DetectorFactory>;
