//! Control channel wire format
//!
//! Every message is a JSON object `{"event": <name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::pipeline::RenderMode;
use crate::webrtc::{AnswerResponse, SdpOffer};

/// Payload naming the target session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTarget {
    #[serde(alias = "session_id")]
    pub connection_id: String,
}

/// Messages sent by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Switch between normal and isolated rendering
    SetViewMode {
        #[serde(alias = "session_id")]
        connection_id: String,
        mode: RenderMode,
    },
    /// Turn annotation on
    StartProcessing(SessionTarget),
    /// Turn annotation off; frames pass through untouched
    StopProcessing(SessionTarget),
    /// Negotiate a new session
    Offer(SdpOffer),
    /// Tear a session down
    #[serde(alias = "close_session")]
    Teardown(SessionTarget),
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| AppError::BadRequest(format!("Invalid control message: {}", e)))
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            ClientMessage::SetViewMode { .. } => "set_view_mode",
            ClientMessage::StartProcessing(_) => "start_processing",
            ClientMessage::StopProcessing(_) => "stop_processing",
            ClientMessage::Offer(_) => "offer",
            ClientMessage::Teardown(_) => "teardown",
        }
    }
}

/// Messages sent to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Greeting sent when the socket opens
    Connected { data: String },
    /// SDP answer for an `offer`
    Answer(AnswerResponse),
    /// A request failed
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
    },
    /// Current controls of a session owned by this socket
    SessionState {
        connection_id: String,
        enabled: bool,
        mode: RenderMode,
    },
    /// A session owned by this socket ended
    SessionClosed { connection_id: String, reason: String },
}

impl ServerMessage {
    pub fn connected() -> Self {
        ServerMessage::Connected {
            data: "Connected to server".to_string(),
        }
    }

    pub fn error(err: &AppError) -> Self {
        ServerMessage::Error {
            error: err.to_string(),
            kind: Some(err.kind().to_string()),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_client_messages() {
        let msg = ClientMessage::parse(
            r#"{"event": "set_view_mode", "data": {"connection_id": "abc", "mode": "black_background"}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::SetViewMode {
                connection_id: "abc".to_string(),
                mode: RenderMode::Isolated,
            }
        );

        let msg = ClientMessage::parse(r#"{"event": "stop_processing", "data": {"session_id": "abc"}}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::StopProcessing(SessionTarget {
                connection_id: "abc".to_string()
            })
        );

        let msg = ClientMessage::parse(r#"{"event": "offer", "data": {"sdp": "v=0", "type": "offer"}}"#).unwrap();
        assert_eq!(msg.event_name(), "offer");
    }

    #[test]
    fn test_malformed_messages_are_bad_requests() {
        for text in [
            "not json",
            r#"{"event": "reboot", "data": {}}"#,
            r#"{"event": "start_processing", "data": {}}"#,
            r#"{"event": "set_view_mode", "data": {"connection_id": "a", "mode": "sepia"}}"#,
        ] {
            assert!(matches!(ClientMessage::parse(text), Err(AppError::BadRequest(_))), "{}", text);
        }
    }

    #[test]
    fn test_server_message_shape() {
        let json: serde_json::Value = serde_json::from_str(&ServerMessage::connected().to_json().unwrap()).unwrap();
        assert_eq!(json["event"], "connected");
        assert_eq!(json["data"]["data"], "Connected to server");

        let err = ServerMessage::error(&AppError::NegotiationFailure("bad".to_string()));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["event"], "error");
        assert_eq!(json["data"]["error"], "Negotiation failed: bad");
        assert_eq!(json["data"]["kind"], "negotiation_failure");
    }
}
