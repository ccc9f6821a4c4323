//! # parlor-realtime
//!
//! Live-channel engine for Parlor. Provides:
//!
//! - Connection registry with multi-device fan-out
//! - JWT session handshake and the `ready` snapshot
//! - Conversation-scoped event dispatch through the membership oracle
//! - Presence derived from connection-set transitions plus sticky statuses
//! - Self-expiring typing/thinking signals

pub mod connection;
pub mod dispatch;
pub mod ephemeral;
pub mod message;
pub mod presence;
pub mod server;
pub mod service;

pub use connection::manager::{ConnectionManager, Session};
pub use connection::registry::ConnectionRegistry;
pub use dispatch::dispatcher::EventDispatcher;
pub use ephemeral::tracker::EphemeralTracker;
pub use presence::tracker::PresenceTracker;
pub use server::RealtimeEngine;
pub use service::ChatService;
