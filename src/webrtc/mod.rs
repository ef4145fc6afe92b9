//! WebRTC transport adapter
//!
//! ```text
//! Browser --offer--> Negotiator --answer--> Browser
//!                        |
//!            on_track: binder.bind(source)
//!                        |
//!     RTP in -> decode -> FramePipeline -> encode -> RTP out
//! ```
//!
//! The rest of the crate only depends on the [`Negotiator`] trait; the
//! webrtc-rs implementation lives in [`peer`].

pub mod codec;
pub mod config;
#[cfg(feature = "h264")]
pub mod h264;
pub mod negotiator;
pub mod peer;
pub mod signaling;
pub mod track;

pub use codec::{default_codec_factory, FrameDecoder, FrameEncoder, SharedCodecFactory, VideoCodecFactory};
pub use config::{TurnServer, VideoCodec, WebRtcConfig};
pub use negotiator::Negotiator;
pub use peer::WebRtcNegotiator;
pub use signaling::{AnswerResponse, ConnectionState, SdpAnswer, SdpOffer};
