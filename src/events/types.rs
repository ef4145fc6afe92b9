//! System event types

use serde::{Deserialize, Serialize};

use crate::pipeline::RenderMode;

/// System event enumeration
///
/// Serialized as `{"event": "session.created", "data": {...}}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum SystemEvent {
    /// A negotiated session received its inbound track and went live
    #[serde(rename = "session.created")]
    SessionCreated {
        session_id: String,
        enabled: bool,
        mode: RenderMode,
    },

    /// A session was torn down
    #[serde(rename = "session.closed")]
    SessionClosed {
        session_id: String,
        /// "teardown", "peer_closed", "socket_closed", "shutdown"
        reason: String,
    },

    /// Processing was switched on or off
    #[serde(rename = "session.processing_changed")]
    SessionProcessingChanged { session_id: String, enabled: bool },

    /// Render mode changed
    #[serde(rename = "session.view_mode_changed")]
    SessionViewModeChanged { session_id: String, mode: RenderMode },

    /// Configuration was updated and persisted
    #[serde(rename = "config.changed")]
    ConfigChanged,

    /// Connection-level error (e.g. subscriber lag)
    #[serde(rename = "error")]
    Error { message: String },
}

impl SystemEvent {
    /// Get the event name (for filtering/routing)
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::SessionCreated { .. } => "session.created",
            Self::SessionClosed { .. } => "session.closed",
            Self::SessionProcessingChanged { .. } => "session.processing_changed",
            Self::SessionViewModeChanged { .. } => "session.view_mode_changed",
            Self::ConfigChanged => "config.changed",
            Self::Error { .. } => "error",
        }
    }

    /// Session the event refers to, if any
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::SessionCreated { session_id, .. }
            | Self::SessionClosed { session_id, .. }
            | Self::SessionProcessingChanged { session_id, .. }
            | Self::SessionViewModeChanged { session_id, .. } => Some(session_id),
            Self::ConfigChanged | Self::Error { .. } => None,
        }
    }

    /// Check if event matches a topic pattern
    ///
    /// Supports `*` and prefix wildcards such as `session.*`.
    pub fn matches_topic(&self, topic: &str) -> bool {
        if topic == "*" {
            return true;
        }

        let event_name = self.event_name();

        if topic.ends_with(".*") {
            let prefix = topic.trim_end_matches(".*");
            event_name.starts_with(prefix)
        } else {
            event_name == topic
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_name_and_session() {
        let event = SystemEvent::SessionProcessingChanged {
            session_id: "abc".to_string(),
            enabled: false,
        };
        assert_eq!(event.event_name(), "session.processing_changed");
        assert_eq!(event.session_id(), Some("abc"));
        assert_eq!(SystemEvent::ConfigChanged.session_id(), None);
    }

    #[test]
    fn test_matches_topic() {
        let event = SystemEvent::SessionClosed {
            session_id: "abc".to_string(),
            reason: "teardown".to_string(),
        };

        assert!(event.matches_topic("*"));
        assert!(event.matches_topic("session.*"));
        assert!(event.matches_topic("session.closed"));
        assert!(!event.matches_topic("config.*"));
    }

    #[test]
    fn test_serialization() {
        let event = SystemEvent::SessionViewModeChanged {
            session_id: "abc".to_string(),
            mode: RenderMode::Isolated,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("session.view_mode_changed"));
        assert!(json.contains("\"isolated\""));

        let deserialized: SystemEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(deserialized, SystemEvent::SessionViewModeChanged { .. }));
    }
}
