use serde::{Deserialize, Serialize};

use crate::landmark::DetectorConfig;
use crate::pipeline::RenderMode;
pub use crate::webrtc::config::{TurnServer, VideoCodec, WebRtcConfig};

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Web server settings
    pub web: WebConfig,
    /// Peer connection settings
    pub webrtc: WebRtcConfig,
    /// Per-session pipeline settings
    pub pipeline: PipelineConfig,
    /// Landmark detector settings
    pub detector: DetectorConfig,
}

/// Web server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// HTTP port
    pub http_port: u16,
    /// Bind address
    pub bind_address: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            http_port: 5005,
            bind_address: "0.0.0.0".to_string(),
        }
    }
}

/// Pipeline and session defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Whether new sessions start with processing on
    pub default_enabled: bool,
    /// Render mode of new sessions
    pub default_mode: RenderMode,
    /// Maximum concurrent sessions, 0 for unlimited
    pub max_sessions: usize,
    /// Minimum interval between repeated annotation failure logs (ms)
    pub failure_log_interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_enabled: true,
            default_mode: RenderMode::Normal,
            max_sessions: 8,
            failure_log_interval_ms: 5000,
        }
    }
}
