//! Landmark detection seam
//!
//! The detection model is an external capability: given an RGB image it
//! returns zero or more landmark sets (pose, face mesh, left hand, right
//! hand). This module defines the result types, the per-category connection
//! topology used for drawing, and the detector/factory traits.

pub mod backend;
pub mod backends;
pub mod topology;
pub mod types;

pub use backend::{DetectorFactory, DetectorOptions, FnDetectorFactory, LandmarkDetector, SharedDetectorFactory};
pub use backends::{factory_from_config, DetectorConfig};
pub use types::{HolisticLandmarks, Landmark, LandmarkCategory};
