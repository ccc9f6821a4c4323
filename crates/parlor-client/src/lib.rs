//! # parlor-client
//!
//! Client side of the Parlor live channel.
//!
//! A [`ChatClient`] owns one logical connection. Behind it a single
//! supervisor task serializes every state change: reconnects after an
//! unexpected close, discards stale channels, reconciles optimistic sends
//! against the server's canonical records, and mirrors the typing and
//! thinking indicators of other members with their own expiry.
//!
//! Transports are pluggable through [`Connector`] and
//! [`MessageSubmitter`]; [`WsConnector`] and [`HttpSubmitter`] talk to a
//! running server.

pub mod cache;
pub mod client;
pub mod signals;
pub mod transport;

mod supervisor;

pub use cache::messages::{DeliveryStatus, LocalId, LocalMessage};
pub use cache::state::{ClientState, ReadStatus};
pub use client::{ChatClient, ClientNotice, LinkState};
pub use signals::mirror::IndicatorKind;
pub use transport::http::{HttpSubmitter, MessageSubmitter};
pub use transport::ws::WsConnector;
pub use transport::{Channel, ChannelEvent, ChannelWriter, Connector, TransportError};
