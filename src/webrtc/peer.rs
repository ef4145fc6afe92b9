//! WebRTC peer connection setup for relay sessions

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtcp::packet::Packet as RtcpPacket;
use webrtc::rtcp::payload_feedbacks::picture_loss_indication::PictureLossIndication;
use webrtc::rtp_transceiver::rtp_codec::{
    RTCRtpCodecCapability, RTCRtpCodecParameters, RTPCodecType,
};
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCPFeedback;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

use super::codec::{default_codec_factory, SharedCodecFactory};
use super::config::{VideoCodec, WebRtcConfig};
use super::negotiator::Negotiator;
use super::signaling::{ConnectionState, SdpAnswer, SdpOffer};
use super::track::{outbound_track, run_receiver, run_sender, VIDEO_CLOCK_RATE};
use crate::error::{AppError, Result};
use crate::pipeline::ChannelFrameSource;
use crate::session::SessionBinder;

fn negotiation_error(context: &str) -> impl Fn(webrtc::Error) -> AppError + '_ {
    move |e| AppError::NegotiationFailure(format!("{}: {}", context, e))
}

/// Negotiates relay sessions with webrtc-rs.
///
/// Each offer gets its own peer connection with one inbound and one
/// outbound video track on the same m-line. The inbound track is decoded,
/// run through the session's pipeline, re-encoded and sent back.
pub struct WebRtcNegotiator {
    config: WebRtcConfig,
    codecs: Option<SharedCodecFactory>,
}

impl WebRtcNegotiator {
    /// Negotiator using the built-in codec backend for the configured codec
    pub fn new(config: WebRtcConfig) -> Self {
        let codecs = default_codec_factory(config.video_codec);
        if codecs.is_none() {
            warn!(
                "No {} codec backend compiled in; offers will be rejected",
                config.video_codec
            );
        }
        Self { config, codecs }
    }

    /// Use a custom codec backend
    pub fn with_codec_factory(mut self, codecs: SharedCodecFactory) -> Self {
        self.codecs = Some(codecs);
        self
    }

    fn build_api(&self, codec: VideoCodec) -> Result<API> {
        let mut media_engine = MediaEngine::default();

        // Only the relay codec is offered so inbound and outbound always match
        let feedback = vec![
            RTCPFeedback {
                typ: "goog-remb".to_string(),
                parameter: String::new(),
            },
            RTCPFeedback {
                typ: "ccm".to_string(),
                parameter: "fir".to_string(),
            },
            RTCPFeedback {
                typ: "nack".to_string(),
                parameter: String::new(),
            },
            RTCPFeedback {
                typ: "nack".to_string(),
                parameter: "pli".to_string(),
            },
        ];
        let payload_type = match codec {
            VideoCodec::H264 => 102,
        };
        media_engine
            .register_codec(
                RTCRtpCodecParameters {
                    capability: RTCRtpCodecCapability {
                        mime_type: codec.mime_type().to_string(),
                        clock_rate: VIDEO_CLOCK_RATE,
                        channels: 0,
                        sdp_fmtp_line: codec.sdp_fmtp_line().to_string(),
                        rtcp_feedback: feedback,
                    },
                    payload_type,
                    ..Default::default()
                },
                RTPCodecType::Video,
            )
            .map_err(negotiation_error("Failed to register codec"))?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)
            .map_err(negotiation_error("Failed to register interceptors"))?;

        Ok(APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build())
    }

    async fn setup(
        &self,
        pc: &Arc<RTCPeerConnection>,
        offer: SdpOffer,
        binder: SessionBinder,
        codecs: SharedCodecFactory,
    ) -> Result<SdpAnswer> {
        let session_id = binder.session_id().to_string();
        let codec = codecs.codec();

        // Outbound track goes in before the offer is applied so the video
        // m-line is answered sendrecv
        let local_track = outbound_track(codec, &session_id);
        let rtp_sender = pc
            .add_track(Arc::clone(&local_track) as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .map_err(negotiation_error("Failed to add video track"))?;

        // Drain RTCP so interceptors (NACK, reports) keep working
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while rtp_sender.read(&mut buf).await.is_ok() {}
        });

        let state_binder = binder.clone();
        pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
            let binder = state_binder.clone();
            Box::pin(async move {
                let Some(state) = ConnectionState::from_rtc(s) else {
                    return;
                };
                info!("Peer {} connection state: {}", binder.session_id(), state);
                if state.is_terminal() {
                    binder.release("peer_closed");
                }
            })
        }));

        let track_binder = binder.clone();
        let weak_pc = Arc::downgrade(pc);
        let queue_depth = self.config.frame_queue_depth.max(1);
        let bitrate_kbps = self.config.target_bitrate_kbps;
        let keyframe_interval = Duration::from_millis(self.config.keyframe_interval_ms);
        pc.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let binder = track_binder.clone();
                let codecs = codecs.clone();
                let local_track = local_track.clone();
                let weak_pc = weak_pc.clone();

                Box::pin(async move {
                    if track.kind() != RTPCodecType::Video {
                        info!("Ignoring {} track for session {}", track.kind(), binder.session_id());
                        return;
                    }

                    let codec_pair = codecs
                        .decoder()
                        .and_then(|decoder| Ok((decoder, codecs.encoder(bitrate_kbps)?)));
                    let (decoder, encoder) = match codec_pair {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!("Session {}: codec setup failed: {}", binder.session_id(), e);
                            binder.release("codec_error");
                            return;
                        }
                    };

                    let (tx, source) = ChannelFrameSource::channel(queue_depth);
                    let Some(pipeline) = binder.bind(Box::new(source)) else {
                        return;
                    };

                    info!(
                        "Session {}: inbound video track (ssrc {}) bound",
                        binder.session_id(),
                        track.ssrc()
                    );

                    tokio::spawn(request_keyframes(
                        weak_pc,
                        track.ssrc(),
                        keyframe_interval,
                        binder.clone(),
                    ));
                    tokio::spawn(run_receiver(
                        binder.session_id().to_string(),
                        track,
                        codec,
                        decoder,
                        tx,
                        binder.child_token(),
                    ));
                    let events = binder.events();
                    tokio::spawn(run_sender(pipeline, encoder, local_track, events));
                })
            },
        ));

        let remote = RTCSessionDescription::offer(offer.sdp)
            .map_err(negotiation_error("Invalid SDP offer"))?;
        pc.set_remote_description(remote)
            .await
            .map_err(negotiation_error("Failed to set remote description"))?;

        let answer = pc
            .create_answer(None)
            .await
            .map_err(negotiation_error("Failed to create answer"))?;

        let mut gather_complete = pc.gathering_complete_promise().await;
        pc.set_local_description(answer)
            .await
            .map_err(negotiation_error("Failed to set local description"))?;

        let timeout = Duration::from_millis(self.config.ice_gathering_timeout_ms);
        if tokio::time::timeout(timeout, gather_complete.recv()).await.is_err() {
            warn!(
                "Session {}: ICE gathering not complete after {:?}, answering with partial candidates",
                session_id, timeout
            );
        }

        let local = pc.local_description().await.ok_or_else(|| {
            AppError::NegotiationFailure("No local description after answer".to_string())
        })?;

        // Close the peer connection whenever the session ends
        let close_pc = Arc::clone(pc);
        let close_binder = binder.clone();
        tokio::spawn(async move {
            close_binder.cancelled().await;
            debug!("Closing peer connection for session {}", close_binder.session_id());
            if let Err(e) = close_pc.close().await {
                debug!("Peer close for session {}: {}", close_binder.session_id(), e);
            }
        });

        Ok(SdpAnswer::new(local.sdp))
    }
}

#[async_trait]
impl Negotiator for WebRtcNegotiator {
    async fn negotiate(&self, offer: SdpOffer, binder: SessionBinder) -> Result<SdpAnswer> {
        offer.validate().map_err(AppError::NegotiationFailure)?;

        let codecs = self.codecs.clone().ok_or_else(|| {
            AppError::NegotiationFailure(format!(
                "no {} codec backend available",
                self.config.video_codec
            ))
        })?;

        let api = self.build_api(codecs.codec())?;
        let rtc_config = RTCConfiguration {
            ice_servers: self.config.ice_servers(),
            ..Default::default()
        };
        let pc = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .map_err(negotiation_error("Failed to create peer connection"))?,
        );

        match self.setup(&pc, offer, binder.clone(), codecs).await {
            Ok(answer) => {
                info!("Answer ready for session {}", binder.session_id());
                Ok(answer)
            }
            Err(e) => {
                let _ = pc.close().await;
                Err(e)
            }
        }
    }
}

/// Ask the remote peer for a keyframe now and then every `interval`
/// (once only when `interval` is zero) until the session ends.
async fn request_keyframes(
    pc: Weak<RTCPeerConnection>,
    media_ssrc: u32,
    interval: Duration,
    binder: SessionBinder,
) {
    loop {
        let Some(pc) = pc.upgrade() else {
            return;
        };
        let pli: Box<dyn RtcpPacket + Send + Sync> = Box::new(PictureLossIndication {
            sender_ssrc: 0,
            media_ssrc,
        });
        if let Err(e) = pc.write_rtcp(&[pli]).await {
            debug!("Session {}: PLI failed: {}", binder.session_id(), e);
        }
        drop(pc);

        if interval.is_zero() {
            return;
        }
        tokio::select! {
            _ = binder.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
