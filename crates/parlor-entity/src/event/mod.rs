//! Live-channel wire protocol.
//!
//! Both directions are JSON objects discriminated by a `type` field.

pub mod client;
pub mod server;

pub use client::{ClientEvent, ClientEventKind};
pub use server::ServerEvent;
