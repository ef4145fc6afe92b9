//! Media tasks bridging WebRTC tracks and the frame pipeline
//!
//! ```text
//! TrackRemote --RTP--> SampleBuilder --AU--> FrameDecoder --BGR--> channel
//!                                                                    |
//!                                                              FramePipeline
//!                                                                    |
//! TrackLocalStaticSample <--Sample-- FrameEncoder <--annotated BGR---+
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use webrtc::media::io::sample_builder::SampleBuilder;
use webrtc::media::Sample;
use webrtc::rtp::codecs::h264::H264Packet;
use webrtc::rtp::packetizer::Depacketizer;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

use super::codec::{FrameDecoder, FrameEncoder};
use super::config::VideoCodec;
use crate::events::{SessionEvents, SystemEvent};
use crate::pipeline::FramePipeline;
use crate::utils::LogThrottler;
use crate::video::{TimeBase, VideoFrame};
use crate::warn_throttled;

/// RTP clock rate of video tracks
pub const VIDEO_CLOCK_RATE: u32 = 90_000;

/// Packets a sample may lag before the builder gives up on it
const MAX_LATE_PACKETS: u16 = 256;

/// Frame duration assumed before two timestamps are known
const DEFAULT_FRAME_DURATION: Duration = Duration::from_millis(33);

/// Capability of the outbound annotated track
pub fn video_capability(codec: VideoCodec) -> RTCRtpCodecCapability {
    RTCRtpCodecCapability {
        mime_type: codec.mime_type().to_string(),
        clock_rate: VIDEO_CLOCK_RATE,
        channels: 0,
        sdp_fmtp_line: codec.sdp_fmtp_line().to_string(),
        rtcp_feedback: vec![],
    }
}

/// Outbound track for one session
pub fn outbound_track(codec: VideoCodec, session_id: &str) -> Arc<TrackLocalStaticSample> {
    Arc::new(TrackLocalStaticSample::new(
        video_capability(codec),
        "annotated-video".to_string(),
        format!("landmark-relay-{}", session_id),
    ))
}

/// Read RTP from `track`, decode complete frames and push them into `tx`.
///
/// Stops when the track ends, the pipeline side hangs up or `cancel` fires.
/// A full queue drops the frame; the pipeline always sees the freshest
/// frames rather than a growing backlog.
pub async fn run_receiver(
    session_id: String,
    track: Arc<TrackRemote>,
    codec: VideoCodec,
    mut decoder: Box<dyn FrameDecoder>,
    tx: mpsc::Sender<VideoFrame>,
    cancel: CancellationToken,
) {
    match codec {
        VideoCodec::H264 => {
            let builder = SampleBuilder::new(MAX_LATE_PACKETS, H264Packet::default(), VIDEO_CLOCK_RATE);
            receive_loop(&session_id, &track, builder, decoder.as_mut(), &tx, &cancel).await
        }
    }
    info!("Receiver for session {} stopped", session_id);
}

async fn receive_loop<T: Depacketizer>(
    session_id: &str,
    track: &TrackRemote,
    mut builder: SampleBuilder<T>,
    decoder: &mut dyn FrameDecoder,
    tx: &mpsc::Sender<VideoFrame>,
    cancel: &CancellationToken,
) {
    let throttler = LogThrottler::default();
    let mut sequence = 0u64;

    loop {
        let packet = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = track.read_rtp() => match result {
                Ok((packet, _)) => packet,
                Err(e) => {
                    debug!("Session {}: RTP read ended: {}", session_id, e);
                    return;
                }
            },
        };

        builder.push(packet);
        while let Some(sample) = builder.pop() {
            let image = match decoder.decode(&sample.data) {
                Ok(Some(image)) => image,
                Ok(None) => continue,
                Err(e) => {
                    warn_throttled!(throttler, "decode", "Session {}: {}", session_id, e);
                    continue;
                }
            };

            let resolution = image.resolution();
            let frame = VideoFrame::from_bgr(image.into_vec(), resolution)
                .with_timing(Some(sample.packet_timestamp as i64), TimeBase::RTP_VIDEO)
                .with_sequence(sequence);
            sequence += 1;

            match tx.try_send(frame) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn_throttled!(throttler, "queue_full", "Session {}: pipeline busy, dropping frame", session_id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => return,
            }
        }
    }
}

/// Tracks presentation time of outgoing samples
#[derive(Debug, Default)]
struct SampleClock {
    last_pts: Option<i64>,
}

impl SampleClock {
    /// Duration until the next frame, derived from consecutive pts values
    fn duration(&mut self, frame: &VideoFrame) -> Duration {
        let duration = match (self.last_pts, frame.pts) {
            // RTP timestamps wrap at 2^32
            (Some(last), Some(pts)) => {
                let delta = (pts as u32).wrapping_sub(last as u32) as i64;
                if delta > 0 && delta < frame.time_base.den as i64 {
                    frame.time_base.to_duration(delta)
                } else {
                    DEFAULT_FRAME_DURATION
                }
            }
            _ => DEFAULT_FRAME_DURATION,
        };
        self.last_pts = frame.pts;
        duration
    }
}

/// Pull frames from the pipeline, encode and write them to the outbound track
/// until the pipeline ends.
///
/// A keyframe is forced whenever the output resolution changes (processing
/// toggled) or the session's view mode changes, so viewers switch cleanly.
pub async fn run_sender(
    mut pipeline: FramePipeline,
    mut encoder: Box<dyn FrameEncoder>,
    track: Arc<TrackLocalStaticSample>,
    mut events: Option<SessionEvents>,
) {
    let session_id = pipeline.session_id().to_string();
    let throttler = LogThrottler::default();
    let mut clock = SampleClock::default();
    let mut last_resolution = None;

    info!("Sender for session {} started", session_id);

    while let Some(frame) = pipeline.next_frame().await {
        if last_resolution != Some(frame.resolution) {
            debug!("Session {}: outbound resolution {}", session_id, frame.resolution);
            encoder.request_keyframe();
            last_resolution = Some(frame.resolution);
        }
        if let Some(events) = events.as_mut() {
            if mode_changed(events) {
                debug!("Session {}: view mode changed, forcing keyframe", session_id);
                encoder.request_keyframe();
            }
        }

        let duration = clock.duration(&frame);
        let data = match encoder.encode(&frame) {
            Ok(data) if data.is_empty() => continue,
            Ok(data) => data,
            Err(e) => {
                warn_throttled!(throttler, "encode", "Session {}: {}", session_id, e);
                continue;
            }
        };

        let sample = Sample {
            data: data.into(),
            duration,
            ..Default::default()
        };
        if let Err(e) = track.write_sample(&sample).await {
            warn_throttled!(throttler, "write", "Session {}: failed to write sample: {}", session_id, e);
        }
    }

    let stats = pipeline.stats();
    info!(
        "Sender for session {} stopped ({} annotated, {} passed through, {} failed)",
        session_id, stats.annotated, stats.passed_through, stats.failed
    );
}

/// Drain pending session events, reporting whether any was a view mode change
fn mode_changed(events: &mut SessionEvents) -> bool {
    let mut changed = false;
    while let Some(event) = events.try_recv() {
        changed |= matches!(event, SystemEvent::SessionViewModeChanged { .. });
    }
    changed
}
