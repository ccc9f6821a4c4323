//! Live connection management: handles, registry, handshake, lifecycle.

pub mod authenticator;
pub mod handle;
pub mod manager;
pub mod registry;

pub use authenticator::{HANDSHAKE_REJECTED, HandshakeError, WsAuthenticator};
pub use handle::ConnectionHandle;
pub use manager::ConnectionManager;
pub use registry::ConnectionRegistry;
