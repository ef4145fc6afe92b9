//! Process-wide session registry

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::controls::SessionControls;
use super::session::{Session, SessionInfo};
use crate::config::PipelineConfig;
use crate::error::{AppError, Result};
use crate::events::{EventBus, SystemEvent};
use crate::landmark::SharedDetectorFactory;
use crate::pipeline::{FramePipeline, FrameSource, RenderMode};

/// Maps session ids to live sessions.
///
/// At most one session exists per id. The map lock is never held across an
/// await point; lookups after teardown return `None`.
///
/// Ids handed out with an answer but not yet bound are tracked as pending,
/// together with their cancellation token, so a teardown can reach a session
/// before its track arrives. Lock order is `sessions` then `pending`.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    pending: Mutex<HashMap<String, CancellationToken>>,
    detectors: SharedDetectorFactory,
    config: ArcSwap<PipelineConfig>,
    events: Option<Arc<EventBus>>,
}

impl SessionRegistry {
    pub fn new(detectors: SharedDetectorFactory, config: PipelineConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            detectors,
            config: ArcSwap::from_pointee(config),
            events: None,
        }
    }

    /// Publish lifecycle and control changes on `events`
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Bus lifecycle and control changes are published on, if any
    pub fn events(&self) -> Option<&Arc<EventBus>> {
        self.events.as_ref()
    }

    fn publish(&self, event: SystemEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }

    /// Replace the defaults used for sessions created from now on.
    /// Live sessions keep their current controls.
    pub fn update_config(&self, config: PipelineConfig) {
        debug!("Pipeline defaults updated: {:?}", config);
        self.config.store(Arc::new(config));
    }

    pub fn config(&self) -> Arc<PipelineConfig> {
        self.config.load_full()
    }

    /// Fail if another session would exceed the configured limit
    pub fn check_capacity(&self) -> Result<()> {
        let max = self.config.load().max_sessions;
        if max > 0 && self.len() >= max {
            return Err(AppError::ServiceUnavailable(format!(
                "session limit reached ({} active)",
                max
            )));
        }
        Ok(())
    }

    /// Record an id announced to a client before its session exists.
    /// Cancelled reservations are pruned on the way.
    pub fn reserve(&self, id: String, cancel: CancellationToken) {
        let mut pending = self.pending.lock();
        pending.retain(|_, token| !token.is_cancelled());
        pending.insert(id, cancel);
    }

    /// Whether `id` is reserved and not yet bound or cancelled
    pub fn is_pending(&self, id: &str) -> bool {
        self.pending
            .lock()
            .get(id)
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Create a session with a fresh id around `source`
    pub fn create(&self, source: Box<dyn FrameSource>) -> Result<(Arc<Session>, FramePipeline)> {
        let id = uuid::Uuid::new_v4().to_string();
        self.create_with_id(id, source, CancellationToken::new())
    }

    /// Create a session under an id handed out earlier (e.g. with an SDP
    /// answer). `cancel` becomes the session's teardown token.
    ///
    /// Refuses ids that are already live, and refuses to publish a session
    /// whose token was cancelled while the detector was being built.
    pub fn create_with_id(
        &self,
        id: String,
        source: Box<dyn FrameSource>,
        cancel: CancellationToken,
    ) -> Result<(Arc<Session>, FramePipeline)> {
        // Build the detector before taking the lock; it may be slow
        let detector = self.detectors.create()?;
        let detector_name = detector.name();
        let config = self.config.load_full();
        let controls = Arc::new(SessionControls::new(config.default_enabled, config.default_mode));
        let session = Arc::new(Session::new(
            id.clone(),
            controls.clone(),
            cancel.clone(),
            detector_name,
        ));

        {
            let mut sessions = self.sessions.write();
            if cancel.is_cancelled() {
                self.pending.lock().remove(&id);
                return Err(AppError::SessionNotFound(format!("Session {} was released", id)));
            }
            if sessions.contains_key(&id) {
                return Err(AppError::BadRequest(format!("Session {} already exists", id)));
            }
            let max = config.max_sessions;
            if max > 0 && sessions.len() >= max {
                return Err(AppError::ServiceUnavailable(format!(
                    "session limit reached ({} active)",
                    max
                )));
            }
            sessions.insert(id.clone(), session.clone());
            self.pending.lock().remove(&id);
        }

        let pipeline = FramePipeline::new(id.clone(), controls, detector, source, cancel)
            .with_failure_log_interval(Duration::from_millis(config.failure_log_interval_ms));

        info!(
            "Session {} created (detector: {}, enabled: {}, mode: {})",
            id,
            detector_name,
            session.enabled(),
            session.mode()
        );
        self.publish(SystemEvent::SessionCreated {
            session_id: id,
            enabled: session.enabled(),
            mode: session.mode(),
        });

        Ok((session, pipeline))
    }

    pub fn lookup(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.read().contains_key(id)
    }

    /// Switch processing on or off. Returns false (and only logs) when the
    /// session does not exist.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> bool {
        let Some(session) = self.lookup(id) else {
            info!("set_enabled({}) ignored: session {} not found", enabled, id);
            return false;
        };
        let previous = session.controls().set_enabled(enabled);
        if previous != enabled {
            info!(
                "Session {}: processing {}",
                id,
                if enabled { "started" } else { "stopped" }
            );
        }
        self.publish(SystemEvent::SessionProcessingChanged {
            session_id: id.to_string(),
            enabled,
        });
        true
    }

    /// Change the render mode. Returns false (and only logs) when the session
    /// does not exist.
    pub fn set_mode(&self, id: &str, mode: RenderMode) -> bool {
        let Some(session) = self.lookup(id) else {
            info!("set_mode({}) ignored: session {} not found", mode, id);
            return false;
        };
        let previous = session.controls().set_mode(mode);
        if previous != mode {
            info!("Session {}: view mode {} -> {}", id, previous, mode);
        }
        self.publish(SystemEvent::SessionViewModeChanged {
            session_id: id.to_string(),
            mode,
        });
        true
    }

    /// Remove and cancel a session. Idempotent; returns whether a session
    /// was actually removed.
    ///
    /// A reserved id that is not bound yet has its token cancelled, so the
    /// binder refuses the track when it arrives.
    pub fn teardown(&self, id: &str, reason: &str) -> bool {
        let removed = {
            let mut sessions = self.sessions.write();
            let removed = sessions.remove(id);
            if removed.is_none() {
                if let Some(token) = self.pending.lock().remove(id) {
                    token.cancel();
                    info!("Pending session {} cancelled before bind ({})", id, reason);
                    return false;
                }
            }
            removed
        };
        match removed {
            Some(session) => {
                session.close();
                info!("Session {} closed ({})", id, reason);
                self.publish(SystemEvent::SessionClosed {
                    session_id: id.to_string(),
                    reason: reason.to_string(),
                });
                true
            }
            None => {
                debug!("Teardown of unknown session {} ({})", id, reason);
                false
            }
        }
    }

    pub fn list(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self.sessions.read().values().map(|s| s.info()).collect();
        infos.sort_by_key(|info| info.created_at);
        infos
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Tear down every session
    pub fn close_all(&self, reason: &str) -> usize {
        let ids: Vec<String> = self.sessions.read().keys().cloned().collect();
        ids.iter().filter(|id| self.teardown(id, reason)).count()
    }

    /// Backend name of the detectors built for new sessions
    pub fn detector_backend(&self) -> &'static str {
        self.detectors.backend()
    }
}
