//! Client control channel
//!
//! Clients negotiate sessions and steer them (processing on/off, render
//! mode, teardown) with small JSON messages over a WebSocket or plain HTTP.

pub mod handler;
pub mod message;

pub use handler::{ControlConnection, ControlHandler};
pub use message::{ClientMessage, ServerMessage, SessionTarget};
