//! WebRTC configuration

use serde::{Deserialize, Serialize};
use webrtc::ice_transport::ice_server::RTCIceServer;

/// WebRTC transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebRtcConfig {
    /// STUN server URLs
    pub stun_servers: Vec<String>,
    /// TURN server configuration
    pub turn_servers: Vec<TurnServer>,
    /// Codec of the outbound annotated track
    pub video_codec: VideoCodec,
    /// Upper bound on ICE gathering before the answer is returned anyway (ms)
    pub ice_gathering_timeout_ms: u64,
    /// Interval between keyframe requests sent to the remote peer (ms)
    pub keyframe_interval_ms: u64,
    /// Target bitrate of the outbound encoder in kbps
    pub target_bitrate_kbps: u32,
    /// Decoded frames buffered between the receive task and the pipeline
    pub frame_queue_depth: usize,
}

impl Default for WebRtcConfig {
    fn default() -> Self {
        Self {
            // Host candidates are enough on a LAN; configure STUN/TURN for remote peers
            stun_servers: vec![],
            turn_servers: vec![],
            video_codec: VideoCodec::H264,
            ice_gathering_timeout_ms: 5000,
            keyframe_interval_ms: 3000,
            target_bitrate_kbps: 2000,
            frame_queue_depth: 4,
        }
    }
}

impl WebRtcConfig {
    /// ICE servers for a new peer connection.
    ///
    /// TURN entries without credentials are skipped.
    pub fn ice_servers(&self) -> Vec<RTCIceServer> {
        let mut servers = Vec::new();

        if !self.stun_servers.is_empty() {
            servers.push(RTCIceServer {
                urls: self.stun_servers.clone(),
                ..Default::default()
            });
        }

        for turn in &self.turn_servers {
            if turn.username.is_empty() || turn.credential.is_empty() {
                tracing::warn!("Skipping TURN server {:?}: missing credentials", turn.urls);
                continue;
            }
            servers.push(RTCIceServer {
                urls: turn.urls.clone(),
                username: turn.username.clone(),
                credential: turn.credential.clone(),
                ..Default::default()
            });
        }

        servers
    }
}

/// TURN server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnServer {
    /// TURN server URLs, e.g. `turn:turn.example.com:3478?transport=udp`
    pub urls: Vec<String>,
    /// Username for TURN authentication
    pub username: String,
    /// Credential for TURN authentication
    pub credential: String,
}

impl TurnServer {
    pub fn new(url: String, username: String, credential: String) -> Self {
        Self {
            urls: vec![url],
            username,
            credential,
        }
    }
}

/// Video codec of the inbound and outbound tracks.
///
/// Only codecs with a software backend are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    #[default]
    H264,
}

impl VideoCodec {
    /// SDP mime type
    pub fn mime_type(&self) -> &'static str {
        match self {
            VideoCodec::H264 => webrtc::api::media_engine::MIME_TYPE_H264,
        }
    }

    /// SDP fmtp line advertised for the outbound track
    pub fn sdp_fmtp_line(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e01f",
        }
    }
}

impl std::fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoCodec::H264 => write!(f, "H.264"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ice_servers_skip_turn_without_credentials() {
        let config = WebRtcConfig {
            stun_servers: vec!["stun:stun.l.google.com:19302".to_string()],
            turn_servers: vec![
                TurnServer::new("turn:a.example.com:3478".to_string(), "".to_string(), "".to_string()),
                TurnServer::new("turn:b.example.com:3478".to_string(), "user".to_string(), "pass".to_string()),
            ],
            ..Default::default()
        };

        let servers = config.ice_servers();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].urls, vec!["stun:stun.l.google.com:19302".to_string()]);
        assert_eq!(servers[1].username, "user");
    }

    #[test]
    fn test_codec_serde() {
        let codec: VideoCodec = serde_json::from_str("\"h264\"").unwrap();
        assert_eq!(codec, VideoCodec::H264);
        assert_eq!(VideoCodec::default().mime_type(), "video/H264");
        // no backend, so not configurable
        assert!(serde_json::from_str::<VideoCodec>("\"vp8\"").is_err());
    }
}
