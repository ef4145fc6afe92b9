//! Sessions: per-connection controls, the registry and the negotiation binder

pub mod binder;
pub mod controls;
pub mod registry;
#[allow(clippy::module_inception)]
pub mod session;

pub use binder::SessionBinder;
pub use controls::SessionControls;
pub use registry::SessionRegistry;
pub use session::{Session, SessionInfo};
