//! Inbound frame decoding, validation, and outbound encoding.

pub mod codec;
pub mod validator;

pub use codec::{DecodeError, decode_client_event, encode_event};
