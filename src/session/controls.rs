use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::pipeline::RenderMode;

/// Per-session flags written by the control channel and read by the pipeline
/// once per frame. Each field is independently last-writer-wins.
#[derive(Debug)]
pub struct SessionControls {
    enabled: AtomicBool,
    mode: AtomicU8,
}

impl SessionControls {
    pub fn new(enabled: bool, mode: RenderMode) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            mode: AtomicU8::new(mode.to_u8()),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Returns the previous value
    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::AcqRel)
    }

    pub fn mode(&self) -> RenderMode {
        RenderMode::from_u8(self.mode.load(Ordering::Acquire))
    }

    /// Returns the previous value
    pub fn set_mode(&self, mode: RenderMode) -> RenderMode {
        RenderMode::from_u8(self.mode.swap(mode.to_u8(), Ordering::AcqRel))
    }

    /// Both flags, read once
    pub fn snapshot(&self) -> (bool, RenderMode) {
        (self.enabled(), self.mode())
    }
}

impl Default for SessionControls {
    fn default() -> Self {
        Self::new(true, RenderMode::Normal)
    }
}
