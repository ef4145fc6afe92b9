use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::ConfigStore;
use crate::control::ControlHandler;
use crate::events::EventBus;
use crate::landmark::SharedDetectorFactory;
use crate::session::SessionRegistry;
use crate::webrtc::Negotiator;

/// Application-wide state shared across handlers
///
/// All session operations go through `registry`; the control channel and
/// the HTTP offer endpoint share one `control` handler.
pub struct AppState {
    /// Configuration store
    pub config: ConfigStore,
    /// Live sessions
    pub registry: Arc<SessionRegistry>,
    /// Control message dispatch and negotiation
    pub control: Arc<ControlHandler>,
    /// Event bus for real-time notifications
    pub events: Arc<EventBus>,
    /// Shutdown signal sender
    pub shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: ConfigStore,
        detectors: SharedDetectorFactory,
        negotiator: Arc<dyn Negotiator>,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Arc<Self> {
        let events = Arc::new(EventBus::new());
        let registry = Arc::new(
            SessionRegistry::new(detectors, config.get().pipeline.clone()).with_events(events.clone()),
        );
        let control = Arc::new(ControlHandler::new(registry.clone(), negotiator));

        Arc::new(Self {
            config,
            registry,
            control,
            events,
            shutdown_tx,
        })
    }

    /// Subscribe to shutdown signal
    pub fn shutdown_signal(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }
}
