//! Event system for real-time state notifications
//!
//! The event bus broadcasts session lifecycle and control changes to
//! WebSocket control connections and any other subscriber. Media tasks of a
//! single session listen through [`SessionEvents`], which sees only that
//! session's events and ends once the session closes.

pub mod types;

pub use types::SystemEvent;

use tokio::sync::broadcast;
use tracing::debug;

/// Event channel capacity (ring buffer size)
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Event bus over a tokio broadcast channel
///
/// ```no_run
/// use landmark_relay::events::{EventBus, SystemEvent};
///
/// let bus = EventBus::new();
/// let mut rx = bus.subscribe();
/// bus.publish(SystemEvent::ConfigChanged);
/// ```
pub struct EventBus {
    tx: broadcast::Sender<SystemEvent>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish an event to all subscribers
    ///
    /// Dropped silently when nobody is subscribed.
    pub fn publish(&self, event: SystemEvent) {
        tracing::trace!("Publishing {}", event.event_name());
        let _ = self.tx.send(event);
    }

    /// Subscribe to events
    ///
    /// Returns a receiver that will receive all future events.
    /// The receiver uses a ring buffer, so if a subscriber falls too far
    /// behind, it will receive a `Lagged` error and miss some events.
    pub fn subscribe(&self) -> broadcast::Receiver<SystemEvent> {
        self.tx.subscribe()
    }

    /// Subscribe to the events of one session only
    pub fn subscribe_session(&self, session_id: impl Into<String>) -> SessionEvents {
        SessionEvents {
            session_id: session_id.into(),
            rx: self.tx.subscribe(),
            closed: false,
        }
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver filtered to one session.
///
/// Yields the session's events in publish order, up to and including its
/// `SessionClosed`, then nothing. Lagging skips the lost events.
pub struct SessionEvents {
    session_id: String,
    rx: broadcast::Receiver<SystemEvent>,
    closed: bool,
}

impl SessionEvents {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Whether the session's close event has been delivered
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Wait for the next event of this session. `None` after the session
    /// closed or once the bus is dropped.
    pub async fn recv(&mut self) -> Option<SystemEvent> {
        while !self.closed {
            match self.rx.recv().await {
                Ok(event) => {
                    if let Some(event) = self.accept(event) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!("Session {} events lagged by {}", self.session_id, n);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
        None
    }

    /// Next already-published event of this session, without waiting
    pub fn try_recv(&mut self) -> Option<SystemEvent> {
        while !self.closed {
            match self.rx.try_recv() {
                Ok(event) => {
                    if let Some(event) = self.accept(event) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    debug!("Session {} events lagged by {}", self.session_id, n);
                }
                Err(_) => return None,
            }
        }
        None
    }

    fn accept(&mut self, event: SystemEvent) -> Option<SystemEvent> {
        if event.session_id() != Some(self.session_id.as_str()) {
            return None;
        }
        if matches!(event, SystemEvent::SessionClosed { .. }) {
            self.closed = true;
        }
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RenderMode;

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(SystemEvent::SessionCreated {
            session_id: "abc".to_string(),
            enabled: true,
            mode: RenderMode::Normal,
        });

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, SystemEvent::SessionCreated { .. }));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(SystemEvent::ConfigChanged);

        assert!(matches!(rx1.recv().await.unwrap(), SystemEvent::ConfigChanged));
        assert!(matches!(rx2.recv().await.unwrap(), SystemEvent::ConfigChanged));
    }

    #[test]
    fn test_no_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(SystemEvent::ConfigChanged);
    }

    fn mode_changed(id: &str) -> SystemEvent {
        SystemEvent::SessionViewModeChanged {
            session_id: id.to_string(),
            mode: RenderMode::Isolated,
        }
    }

    fn closed(id: &str) -> SystemEvent {
        SystemEvent::SessionClosed {
            session_id: id.to_string(),
            reason: "teardown".to_string(),
        }
    }

    #[tokio::test]
    async fn test_session_events_are_filtered() {
        let bus = EventBus::new();
        let mut events = bus.subscribe_session("a");
        assert_eq!(events.session_id(), "a");

        bus.publish(mode_changed("b"));
        bus.publish(SystemEvent::ConfigChanged);
        bus.publish(mode_changed("a"));
        bus.publish(closed("b"));
        bus.publish(closed("a"));
        bus.publish(mode_changed("a"));

        assert!(matches!(
            events.recv().await,
            Some(SystemEvent::SessionViewModeChanged { ref session_id, .. }) if session_id == "a"
        ));
        assert!(matches!(events.recv().await, Some(SystemEvent::SessionClosed { .. })));
        assert!(events.is_closed());
        // nothing after the close, even though more was published
        assert!(events.recv().await.is_none());
    }

    #[test]
    fn test_session_events_try_recv() {
        let bus = EventBus::new();
        let mut events = bus.subscribe_session("a");
        assert!(events.try_recv().is_none());

        bus.publish(mode_changed("b"));
        assert!(events.try_recv().is_none());

        bus.publish(mode_changed("a"));
        assert!(events.try_recv().is_some());
        assert!(events.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_session_events_end_with_bus() {
        let bus = EventBus::new();
        let mut events = bus.subscribe_session("a");
        drop(bus);
        assert!(events.recv().await.is_none());
    }
}
