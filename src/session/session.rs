use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::controls::SessionControls;
use crate::pipeline::RenderMode;

/// One live media exchange
///
/// Holds the mutable controls shared with the session's pipeline and the
/// token that ends it. The pipeline itself (detector and inbound source) is
/// owned by whoever pulls frames from it.
#[derive(Debug)]
pub struct Session {
    id: String,
    controls: Arc<SessionControls>,
    cancel: CancellationToken,
    created_at: DateTime<Utc>,
    detector: &'static str,
}

impl Session {
    pub(crate) fn new(
        id: String,
        controls: Arc<SessionControls>,
        cancel: CancellationToken,
        detector: &'static str,
    ) -> Self {
        Self {
            id,
            controls,
            cancel,
            created_at: Utc::now(),
            detector,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn controls(&self) -> &Arc<SessionControls> {
        &self.controls
    }

    pub fn enabled(&self) -> bool {
        self.controls.enabled()
    }

    pub fn mode(&self) -> RenderMode {
        self.controls.mode()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn close(&self) {
        self.cancel.cancel();
    }

    pub fn info(&self) -> SessionInfo {
        let (enabled, mode) = self.controls.snapshot();
        SessionInfo {
            connection_id: self.id.clone(),
            enabled,
            mode,
            detector: self.detector.to_string(),
            created_at: self.created_at,
        }
    }
}

/// Serializable view of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub connection_id: String,
    pub enabled: bool,
    pub mode: RenderMode,
    pub detector: String,
    pub created_at: DateTime<Utc>,
}
