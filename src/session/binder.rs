use std::sync::Arc;

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::warn;

use super::registry::SessionRegistry;
use crate::events::SessionEvents;
use crate::pipeline::{FramePipeline, FrameSource};

/// Handed to a negotiator so its inbound-track callback can publish the
/// session once the source exists.
///
/// Carries the session id announced in the answer, the registry and the
/// session's cancellation token. Cloning is cheap; all clones refer to the
/// same pending session.
#[derive(Clone)]
pub struct SessionBinder {
    session_id: String,
    registry: Arc<SessionRegistry>,
    cancel: CancellationToken,
}

impl SessionBinder {
    /// Binder for a freshly allocated session id
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), registry)
    }

    /// Binder for `session_id`, reserved in the registry until bound or
    /// released
    pub fn with_id(session_id: String, registry: Arc<SessionRegistry>) -> Self {
        let cancel = CancellationToken::new();
        registry.reserve(session_id.clone(), cancel.clone());
        Self {
            session_id,
            registry,
            cancel,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Create and register the session around `source`.
    ///
    /// Returns `None` if the session was released before the track arrived
    /// (including a release that races with this call), if a session with
    /// this id is already bound, or if the detector could not be built.
    pub fn bind(&self, source: Box<dyn FrameSource>) -> Option<FramePipeline> {
        if self.cancel.is_cancelled() {
            warn!("Track for session {} arrived after release, ignoring", self.session_id);
            return None;
        }
        match self
            .registry
            .create_with_id(self.session_id.clone(), source, self.cancel.clone())
        {
            Ok((_, pipeline)) => Some(pipeline),
            Err(e) => {
                warn!("Failed to bind session {}: {}", self.session_id, e);
                None
            }
        }
    }

    /// Tear the session down (if bound) and cancel everything attached to it
    pub fn release(&self, reason: &str) {
        self.registry.teardown(&self.session_id, reason);
        self.cancel.cancel();
    }

    pub fn is_released(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the session is torn down from any side
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// This session's control and lifecycle events, when the registry
    /// publishes any
    pub fn events(&self) -> Option<SessionEvents> {
        self.registry
            .events()
            .map(|bus| bus.subscribe_session(self.session_id.clone()))
    }

    /// Child token for tasks that must stop with the session
    pub fn child_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }
}

impl std::fmt::Debug for SessionBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBinder")
            .field("session_id", &self.session_id)
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::landmark::backends::NoneDetectorFactory;
    use crate::landmark::DetectorOptions;
    use crate::pipeline::ChannelFrameSource;

    fn registry() -> Arc<SessionRegistry> {
        Arc::new(SessionRegistry::new(
            Arc::new(NoneDetectorFactory::new(DetectorOptions::default())),
            PipelineConfig::default(),
        ))
    }

    fn source() -> Box<dyn FrameSource> {
        Box::new(ChannelFrameSource::channel(1).1)
    }

    #[test]
    fn test_bind_publishes_under_announced_id() {
        let registry = registry();
        let binder = SessionBinder::new(registry.clone());
        assert!(registry.lookup(binder.session_id()).is_none());

        let pipeline = binder.bind(source()).unwrap();
        assert_eq!(pipeline.session_id(), binder.session_id());
        assert!(registry.lookup(binder.session_id()).is_some());

        // a second track for the same session is refused
        assert!(binder.bind(source()).is_none());
    }

    #[test]
    fn test_release_before_bind() {
        let registry = registry();
        let binder = SessionBinder::new(registry.clone());
        binder.release("peer_closed");
        assert!(binder.is_released());
        assert!(binder.bind(source()).is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_registry_teardown_cancels_binder() {
        let registry = registry();
        let binder = SessionBinder::new(registry.clone());
        let _pipeline = binder.bind(source()).unwrap();

        registry.teardown(binder.session_id(), "teardown");
        binder.cancelled().await;
        assert!(binder.is_released());
    }

    #[test]
    fn test_teardown_before_track_reaches_binder() {
        let registry = registry();
        let binder = SessionBinder::new(registry.clone());
        assert!(registry.is_pending(binder.session_id()));

        // e.g. DELETE /api/sessions/{id} while the peer is still connecting
        assert!(!registry.teardown(binder.session_id(), "http_delete"));
        assert!(binder.is_released());
        assert!(binder.bind(source()).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_debug_shows_id_and_state() {
        let binder = SessionBinder::with_id("abc".to_string(), registry());
        assert_eq!(format!("{:?}", binder), r#"SessionBinder { session_id: "abc", released: false }"#);
        binder.release("teardown");
        assert!(format!("{:?}", binder).contains("released: true"));
    }
}
