//! landmark-relay - WebRTC relay that annotates live video with landmarks
//!
//! Each client session receives its own video back with body pose, face
//! mesh and hand skeletons drawn over it (or on a black canvas), framed by
//! a thin green border. Processing and render mode can be changed at any
//! time over the control channel.

pub mod config;
pub mod control;
pub mod error;
pub mod events;
pub mod landmark;
pub mod pipeline;
pub mod session;
pub mod state;
pub mod utils;
pub mod video;
pub mod web;
pub mod webrtc;

pub use error::{AppError, Result};
