use async_trait::async_trait;

use super::signaling::{SdpAnswer, SdpOffer};
use crate::error::Result;
use crate::session::SessionBinder;

/// Turns a remote offer into a live media exchange.
///
/// Implementations set up a peer context, arrange for the inbound video
/// track to be passed to `binder.bind`, and return the local answer. Errors
/// are reported as [`AppError::NegotiationFailure`](crate::error::AppError).
/// The caller releases the binder when negotiation fails.
#[async_trait]
pub trait Negotiator: Send + Sync {
    async fn negotiate(&self, offer: SdpOffer, binder: SessionBinder) -> Result<SdpAnswer>;
}
