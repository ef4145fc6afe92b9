use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::video::VideoFrame;

/// Inbound frame source bound to one session
#[async_trait]
pub trait FrameSource: Send {
    /// Next decoded frame, `None` once the source has ended
    async fn recv(&mut self) -> Option<VideoFrame>;
}

/// Frame source backed by a tokio channel
///
/// Transport adapters decode on their own task and push frames into the
/// sender half; the pipeline pulls from this end.
pub struct ChannelFrameSource {
    rx: mpsc::Receiver<VideoFrame>,
}

impl ChannelFrameSource {
    pub fn new(rx: mpsc::Receiver<VideoFrame>) -> Self {
        Self { rx }
    }

    /// Create a bounded channel and its source end
    pub fn channel(capacity: usize) -> (mpsc::Sender<VideoFrame>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl FrameSource for ChannelFrameSource {
    async fn recv(&mut self) -> Option<VideoFrame> {
        self.rx.recv().await
    }
}
