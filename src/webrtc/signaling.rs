//! Signaling types exchanged with clients

use serde::{Deserialize, Serialize};
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

/// SDP offer from a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdpOffer {
    /// SDP content
    pub sdp: String,
    /// Description type, always "offer" for well-behaved clients
    #[serde(rename = "type", default = "SdpOffer::default_type")]
    pub sdp_type: String,
}

impl SdpOffer {
    pub fn new(sdp: impl Into<String>) -> Self {
        Self {
            sdp: sdp.into(),
            sdp_type: Self::default_type(),
        }
    }

    fn default_type() -> String {
        "offer".to_string()
    }

    /// Reject anything that is not a non-empty offer
    pub fn validate(&self) -> Result<(), String> {
        if !self.sdp_type.eq_ignore_ascii_case("offer") {
            return Err(format!("expected an offer, got '{}'", self.sdp_type));
        }
        if self.sdp.trim().is_empty() {
            return Err("empty SDP".to_string());
        }
        Ok(())
    }
}

/// SDP answer returned to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdpAnswer {
    /// SDP content
    pub sdp: String,
    /// Description type ("answer")
    #[serde(rename = "type")]
    pub sdp_type: String,
}

impl SdpAnswer {
    pub fn new(sdp: impl Into<String>) -> Self {
        Self {
            sdp: sdp.into(),
            sdp_type: "answer".to_string(),
        }
    }
}

/// Answer plus the id of the session it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub sdp: String,
    #[serde(rename = "type")]
    pub sdp_type: String,
    pub connection_id: String,
}

impl AnswerResponse {
    pub fn new(answer: SdpAnswer, connection_id: impl Into<String>) -> Self {
        Self {
            sdp: answer.sdp,
            sdp_type: answer.sdp_type,
            connection_id: connection_id.into(),
        }
    }
}

/// Peer connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl ConnectionState {
    /// Whether the connection is gone for good from this session's point of view
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConnectionState::Disconnected | ConnectionState::Failed | ConnectionState::Closed
        )
    }

    pub fn from_rtc(state: RTCPeerConnectionState) -> Option<Self> {
        match state {
            RTCPeerConnectionState::New => Some(ConnectionState::New),
            RTCPeerConnectionState::Connecting => Some(ConnectionState::Connecting),
            RTCPeerConnectionState::Connected => Some(ConnectionState::Connected),
            RTCPeerConnectionState::Disconnected => Some(ConnectionState::Disconnected),
            RTCPeerConnectionState::Failed => Some(ConnectionState::Failed),
            RTCPeerConnectionState::Closed => Some(ConnectionState::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::New => write!(f, "new"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Failed => write!(f, "failed"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_validation() {
        let offer: SdpOffer = serde_json::from_str(r#"{"sdp": "v=0\r\n", "type": "offer"}"#).unwrap();
        assert!(offer.validate().is_ok());

        let offer: SdpOffer = serde_json::from_str(r#"{"sdp": "v=0\r\n"}"#).unwrap();
        assert_eq!(offer.sdp_type, "offer");

        let answer = SdpOffer {
            sdp: "v=0".to_string(),
            sdp_type: "answer".to_string(),
        };
        assert!(answer.validate().is_err());
        assert!(SdpOffer::new("  ").validate().is_err());
    }

    #[test]
    fn test_answer_response_shape() {
        let response = AnswerResponse::new(SdpAnswer::new("v=0"), "abc");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "answer");
        assert_eq!(json["connection_id"], "abc");
    }

    #[test]
    fn test_terminal_states() {
        assert!(ConnectionState::Failed.is_terminal());
        assert!(!ConnectionState::Connected.is_terminal());
        assert_eq!(
            ConnectionState::from_rtc(RTCPeerConnectionState::Closed),
            Some(ConnectionState::Closed)
        );
    }
}
