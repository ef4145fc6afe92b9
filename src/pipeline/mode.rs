use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// How the annotated frame's background is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Overlays drawn on top of the camera image
    #[default]
    Normal,
    /// Overlays drawn on a black canvas
    #[serde(alias = "black_background")]
    Isolated,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Normal => "normal",
            RenderMode::Isolated => "isolated",
        }
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            RenderMode::Normal => 0,
            RenderMode::Isolated => 1,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => RenderMode::Isolated,
            _ => RenderMode::Normal,
        }
    }
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RenderMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(RenderMode::Normal),
            "isolated" | "black_background" => Ok(RenderMode::Isolated),
            other => Err(AppError::BadRequest(format!("Unknown view mode: {}", other))),
        }
    }
}
