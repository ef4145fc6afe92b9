//! Control request dispatch
//!
//! One [`ControlHandler`] serves every client; each socket keeps a
//! [`ControlConnection`] recording the sessions it negotiated so they can be
//! torn down when the socket goes away.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::message::{ClientMessage, ServerMessage};
use crate::error::{AppError, Result};
use crate::events::SystemEvent;
use crate::session::{SessionBinder, SessionRegistry};
use crate::webrtc::{AnswerResponse, Negotiator, SdpOffer};

/// Per-socket state
pub struct ControlConnection {
    id: String,
    owned: HashMap<String, SessionBinder>,
}

impl ControlConnection {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owned: HashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owns(&self, session_id: &str) -> bool {
        self.owned.contains_key(session_id)
    }

    pub fn owned_sessions(&self) -> impl Iterator<Item = &str> {
        self.owned.keys().map(String::as_str)
    }
}

impl Default for ControlConnection {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ControlHandler {
    registry: Arc<SessionRegistry>,
    negotiator: Arc<dyn Negotiator>,
}

impl ControlHandler {
    pub fn new(registry: Arc<SessionRegistry>, negotiator: Arc<dyn Negotiator>) -> Self {
        Self { registry, negotiator }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Negotiate a new session.
    ///
    /// The session id is allocated here and returned with the answer; the
    /// session itself appears in the registry once the inbound track
    /// arrives. On failure nothing is left behind.
    pub async fn offer(&self, offer: SdpOffer) -> Result<(AnswerResponse, SessionBinder)> {
        self.registry
            .check_capacity()
            .map_err(|e| AppError::NegotiationFailure(e.to_string()))?;

        let binder = SessionBinder::new(self.registry.clone());
        debug!("Negotiating session {}", binder.session_id());

        match self.negotiator.negotiate(offer, binder.clone()).await {
            Ok(answer) => {
                info!("Answered offer for session {}", binder.session_id());
                Ok((AnswerResponse::new(answer, binder.session_id()), binder))
            }
            Err(e) => {
                binder.release("negotiation_failed");
                Err(match e {
                    AppError::NegotiationFailure(_) => e,
                    other => AppError::NegotiationFailure(other.to_string()),
                })
            }
        }
    }

    /// Apply one client message; returns the direct reply, if any.
    ///
    /// Control messages for unknown sessions are logged no-ops.
    pub async fn handle_message(&self, conn: &mut ControlConnection, msg: ClientMessage) -> Option<ServerMessage> {
        debug!("Connection {}: {}", conn.id, msg.event_name());
        match msg {
            ClientMessage::SetViewMode { connection_id, mode } => {
                self.registry.set_mode(&connection_id, mode);
                None
            }
            ClientMessage::StartProcessing(target) => {
                self.registry.set_enabled(&target.connection_id, true);
                None
            }
            ClientMessage::StopProcessing(target) => {
                self.registry.set_enabled(&target.connection_id, false);
                None
            }
            ClientMessage::Teardown(target) => {
                match conn.owned.remove(&target.connection_id) {
                    Some(binder) => binder.release("teardown"),
                    None => {
                        self.registry.teardown(&target.connection_id, "teardown");
                    }
                }
                None
            }
            ClientMessage::Offer(offer) => match self.offer(offer).await {
                Ok((response, binder)) => {
                    conn.owned.insert(binder.session_id().to_string(), binder);
                    Some(ServerMessage::Answer(response))
                }
                Err(e) => {
                    warn!("Connection {}: offer failed: {}", conn.id, e);
                    Some(ServerMessage::error(&e))
                }
            },
        }
    }

    /// Parse and apply a raw text frame. Malformed input yields an error
    /// reply; the connection stays usable.
    pub async fn handle_text(&self, conn: &mut ControlConnection, text: &str) -> Option<ServerMessage> {
        match ClientMessage::parse(text) {
            Ok(msg) => self.handle_message(conn, msg).await,
            Err(e) => {
                debug!("Connection {}: {}", conn.id, e);
                Some(ServerMessage::error(&e))
            }
        }
    }

    /// Translate a bus event into a notification for `conn`, if it concerns
    /// one of its sessions.
    pub fn forward_event(&self, conn: &mut ControlConnection, event: &SystemEvent) -> Option<ServerMessage> {
        let session_id = event.session_id()?;
        if !conn.owns(session_id) {
            return None;
        }
        match event {
            SystemEvent::SessionClosed { session_id, reason } => {
                conn.owned.remove(session_id);
                Some(ServerMessage::SessionClosed {
                    connection_id: session_id.clone(),
                    reason: reason.clone(),
                })
            }
            _ => {
                let session = self.registry.lookup(session_id)?;
                Some(ServerMessage::SessionState {
                    connection_id: session_id.to_string(),
                    enabled: session.enabled(),
                    mode: session.mode(),
                })
            }
        }
    }

    /// Release every session the socket negotiated
    pub fn disconnect(&self, conn: ControlConnection) -> usize {
        let count = conn.owned.len();
        for binder in conn.owned.into_values() {
            binder.release("socket_closed");
        }
        if count > 0 {
            info!("Connection {} closed, released {} session(s)", conn.id, count);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::events::EventBus;
    use crate::landmark::backends::NoneDetectorFactory;
    use crate::landmark::DetectorOptions;
    use crate::pipeline::{ChannelFrameSource, FramePipeline, RenderMode};
    use crate::webrtc::SdpAnswer;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Answers every offer and binds a channel source right away, as if the
    /// remote track had already arrived.
    #[derive(Default)]
    struct MockNegotiator {
        fail: bool,
        pipelines: Mutex<Vec<FramePipeline>>,
    }

    #[async_trait]
    impl Negotiator for MockNegotiator {
        async fn negotiate(&self, offer: SdpOffer, binder: SessionBinder) -> Result<SdpAnswer> {
            if self.fail {
                return Err(AppError::Internal("ice exploded".to_string()));
            }
            offer.validate().map_err(AppError::NegotiationFailure)?;
            let (_tx, source) = ChannelFrameSource::channel(1);
            if let Some(pipeline) = binder.bind(Box::new(source)) {
                self.pipelines.lock().push(pipeline);
            }
            Ok(SdpAnswer::new("v=0 mock-answer"))
        }
    }

    fn handler_with(negotiator: MockNegotiator, config: PipelineConfig) -> (ControlHandler, Arc<EventBus>) {
        let events = Arc::new(EventBus::new());
        let registry = Arc::new(
            SessionRegistry::new(Arc::new(NoneDetectorFactory::new(DetectorOptions::default())), config)
                .with_events(events.clone()),
        );
        (ControlHandler::new(registry, Arc::new(negotiator)), events)
    }

    fn handler() -> (ControlHandler, Arc<EventBus>) {
        handler_with(MockNegotiator::default(), PipelineConfig::default())
    }

    async fn negotiate(handler: &ControlHandler, conn: &mut ControlConnection) -> String {
        let msg = ClientMessage::Offer(SdpOffer::new("v=0 mock-offer"));
        match handler.handle_message(conn, msg).await {
            Some(ServerMessage::Answer(answer)) => {
                assert_eq!(answer.sdp_type, "answer");
                answer.connection_id
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_offer_then_controls() {
        let (handler, _events) = handler();
        let mut conn = ControlConnection::new();
        let id = negotiate(&handler, &mut conn).await;
        assert!(conn.owns(&id));

        let session = handler.registry().lookup(&id).unwrap();
        assert!(session.enabled());

        let text = format!(r#"{{"event": "stop_processing", "data": {{"connection_id": "{}"}}}}"#, id);
        assert!(handler.handle_text(&mut conn, &text).await.is_none());
        assert!(!session.enabled());

        let text = format!(
            r#"{{"event": "set_view_mode", "data": {{"session_id": "{}", "mode": "isolated"}}}}"#,
            id
        );
        handler.handle_text(&mut conn, &text).await;
        assert_eq!(session.mode(), RenderMode::Isolated);

        let text = format!(r#"{{"event": "teardown", "data": {{"connection_id": "{}"}}}}"#, id);
        handler.handle_text(&mut conn, &text).await;
        assert!(handler.registry().lookup(&id).is_none());
        assert!(session.is_closed());
        assert!(!conn.owns(&id));
    }

    #[tokio::test]
    async fn test_unknown_session_is_noop() {
        let (handler, _events) = handler();
        let mut conn = ControlConnection::new();
        let reply = handler
            .handle_message(
                &mut conn,
                ClientMessage::SetViewMode {
                    connection_id: "missing".to_string(),
                    mode: RenderMode::Isolated,
                },
            )
            .await;
        assert!(reply.is_none());
        assert!(handler.registry().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_text_reports_error() {
        let (handler, _events) = handler();
        let mut conn = ControlConnection::new();
        match handler.handle_text(&mut conn, "{oops").await {
            Some(ServerMessage::Error { kind, .. }) => assert_eq!(kind.as_deref(), Some("bad_request")),
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_negotiation_leaves_nothing() {
        let (handler, _events) = handler_with(
            MockNegotiator {
                fail: true,
                ..Default::default()
            },
            PipelineConfig::default(),
        );
        let mut conn = ControlConnection::new();
        let reply = handler
            .handle_message(&mut conn, ClientMessage::Offer(SdpOffer::new("v=0")))
            .await;
        match reply {
            Some(ServerMessage::Error { kind, .. }) => assert_eq!(kind.as_deref(), Some("negotiation_failure")),
            other => panic!("unexpected reply: {:?}", other),
        }
        assert!(handler.registry().is_empty());
        assert_eq!(conn.owned_sessions().count(), 0);
    }

    #[tokio::test]
    async fn test_capacity_is_a_negotiation_failure() {
        let (handler, _events) = handler_with(
            MockNegotiator::default(),
            PipelineConfig {
                max_sessions: 1,
                ..Default::default()
            },
        );
        let mut conn = ControlConnection::new();
        negotiate(&handler, &mut conn).await;
        let err = handler.offer(SdpOffer::new("v=0")).await.unwrap_err();
        assert!(matches!(err, AppError::NegotiationFailure(_)));
    }

    #[tokio::test]
    async fn test_disconnect_releases_owned_sessions() {
        let (handler, _events) = handler();
        let mut mine = ControlConnection::new();
        let mut theirs = ControlConnection::new();
        let a = negotiate(&handler, &mut mine).await;
        let b = negotiate(&handler, &mut mine).await;
        let c = negotiate(&handler, &mut theirs).await;

        assert_eq!(handler.disconnect(mine), 2);
        assert!(handler.registry().lookup(&a).is_none());
        assert!(handler.registry().lookup(&b).is_none());
        assert!(handler.registry().lookup(&c).is_some());
    }

    #[tokio::test]
    async fn test_forward_event_only_for_owned_sessions() {
        let (handler, events) = handler();
        let mut rx = events.subscribe();
        let mut mine = ControlConnection::new();
        let mut theirs = ControlConnection::new();
        let id = negotiate(&handler, &mut mine).await;

        let created = rx.recv().await.unwrap();
        assert!(handler.forward_event(&mut theirs, &created).is_none());
        assert!(matches!(
            handler.forward_event(&mut mine, &created),
            Some(ServerMessage::SessionState { enabled: true, .. })
        ));

        handler.registry().set_enabled(&id, false);
        let changed = rx.recv().await.unwrap();
        assert!(matches!(
            handler.forward_event(&mut mine, &changed),
            Some(ServerMessage::SessionState { enabled: false, .. })
        ));

        handler.registry().teardown(&id, "teardown");
        let closed = rx.recv().await.unwrap();
        match handler.forward_event(&mut mine, &closed) {
            Some(ServerMessage::SessionClosed { connection_id, reason }) => {
                assert_eq!(connection_id, id);
                assert_eq!(reason, "teardown");
            }
            other => panic!("unexpected message: {:?}", other),
        }
        assert!(!mine.owns(&id));
    }
}
