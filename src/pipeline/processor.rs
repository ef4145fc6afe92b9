//! Per-session frame pipeline

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::annotate::annotate;
use super::source::FrameSource;
use crate::landmark::LandmarkDetector;
use crate::session::SessionControls;
use crate::utils::LogThrottler;
use crate::video::VideoFrame;
use crate::warn_throttled;

/// Frame counters for one pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames annotated successfully
    pub annotated: u64,
    /// Frames forwarded untouched because processing was disabled
    pub passed_through: u64,
    /// Frames forwarded untouched because annotation failed
    pub failed: u64,
}

/// Wraps a session's inbound source. Each pull yields the next frame,
/// annotated according to the session's current controls.
///
/// The pipeline exclusively owns the session's detector and source; both are
/// released when it is dropped.
pub struct FramePipeline {
    session_id: String,
    controls: Arc<SessionControls>,
    detector: Box<dyn LandmarkDetector>,
    source: Box<dyn FrameSource>,
    cancel: CancellationToken,
    throttler: LogThrottler,
    stats: PipelineStats,
}

impl FramePipeline {
    pub fn new(
        session_id: impl Into<String>,
        controls: Arc<SessionControls>,
        detector: Box<dyn LandmarkDetector>,
        source: Box<dyn FrameSource>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            controls,
            detector,
            source,
            cancel,
            throttler: LogThrottler::default(),
            stats: PipelineStats::default(),
        }
    }

    /// Interval between repeated failure logs
    pub fn with_failure_log_interval(mut self, interval: Duration) -> Self {
        self.throttler = LogThrottler::new(interval);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Wait for the next inbound frame and process it.
    ///
    /// Resolves to `None` once the source ends or the session is torn down.
    /// Annotation failures never surface here: the original frame is
    /// returned instead.
    pub async fn next_frame(&mut self) -> Option<VideoFrame> {
        let frame = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("Session {} cancelled, pipeline ending", self.session_id);
                return None;
            }
            frame = self.source.recv() => frame,
        };

        match frame {
            Some(frame) => Some(self.process(frame)),
            None => {
                info!("Inbound source for session {} ended", self.session_id);
                None
            }
        }
    }

    /// Apply gating and annotation to one frame
    pub fn process(&mut self, frame: VideoFrame) -> VideoFrame {
        let (enabled, mode) = self.controls.snapshot();
        if !enabled {
            self.stats.passed_through += 1;
            return frame;
        }

        match annotate(&frame, mode, self.detector.as_mut()) {
            Ok(image) => {
                self.stats.annotated += 1;
                self.throttler.clear("annotate");
                let resolution = image.resolution();
                frame.with_pixels(image.into_vec(), resolution)
            }
            Err(e) => {
                self.stats.failed += 1;
                warn_throttled!(
                    self.throttler,
                    "annotate",
                    "Session {}: annotation failed on frame {}, forwarding original: {}",
                    self.session_id,
                    frame.sequence,
                    e
                );
                frame
            }
        }
    }
}

impl Drop for FramePipeline {
    fn drop(&mut self) {
        debug!(
            "Pipeline for session {} released ({} annotated, {} passed through, {} failed, detector {})",
            self.session_id,
            self.stats.annotated,
            self.stats.passed_through,
            self.stats.failed,
            self.detector.name()
        );
    }
}
