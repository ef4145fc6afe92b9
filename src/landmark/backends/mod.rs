//! Built-in detector backends

pub mod none;
pub mod replay;

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use none::{NoneDetector, NoneDetectorFactory};
pub use replay::{ReplayDetector, ReplayDetectorFactory};

use super::backend::{DetectorOptions, SharedDetectorFactory};
use crate::error::{AppError, Result};

/// Detector backend selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Backend name: "none" or "replay"
    pub backend: String,
    /// Landmark track for the replay backend
    pub replay_path: Option<PathBuf>,
    /// Model options
    pub options: DetectorOptions,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            backend: "none".to_string(),
            replay_path: None,
            options: DetectorOptions::default(),
        }
    }
}

/// Build the factory for the configured backend
pub fn factory_from_config(config: &DetectorConfig) -> Result<SharedDetectorFactory> {
    match config.backend.as_str() {
        "none" => Ok(Arc::new(NoneDetectorFactory::new(config.options.clone()))),
        "replay" => {
            let path = config.replay_path.as_ref().ok_or_else(|| {
                AppError::Config("replay detector requires detector.replay_path".to_string())
            })?;
            Ok(Arc::new(ReplayDetectorFactory::from_file(path)?))
        }
        other => Err(AppError::Config(format!("Unknown detector backend: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_from_config() {
        let factory = factory_from_config(&DetectorConfig::default()).unwrap();
        assert_eq!(factory.backend(), "none");

        let config = DetectorConfig {
            backend: "replay".to_string(),
            ..Default::default()
        };
        assert!(matches!(factory_from_config(&config), Err(AppError::Config(_))));

        let config = DetectorConfig {
            backend: "mystery".to_string(),
            ..Default::default()
        };
        assert!(factory_from_config(&config).is_err());
    }
}
