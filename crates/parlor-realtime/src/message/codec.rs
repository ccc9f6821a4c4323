//! JSON codec for the live channel.
//!
//! Decoding happens in two steps: the `type` discriminant is read first so
//! that field errors can be reported against the event they belong to,
//! then the full payload is decoded into a [`ClientEvent`].

use serde_json::Value;
use thiserror::Error;

use parlor_core::error::AppError;
use parlor_entity::{ClientEvent, ClientEventKind, MessageFormat, ServerEvent};

/// Why an inbound frame could not be turned into a [`ClientEvent`].
///
/// The `Display` text is sent verbatim in the `error` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Invalid payload")]
    Malformed,
    #[error("Unknown event")]
    UnknownEvent,
    #[error("Invalid message payload")]
    InvalidMessage,
    #[error("Invalid format")]
    InvalidFormat,
    #[error("Invalid typing payload")]
    InvalidTyping,
    #[error("Invalid thinking payload")]
    InvalidThinking,
}

/// Decodes one inbound text frame.
pub fn decode_client_event(raw: &str) -> Result<ClientEvent, DecodeError> {
    let value: Value = serde_json::from_str(raw).map_err(|_| DecodeError::Malformed)?;

    let kind = value
        .get("type")
        .and_then(|t| serde_json::from_value::<ClientEventKind>(t.clone()).ok())
        .unwrap_or(ClientEventKind::Unknown);

    let field_error = match kind {
        ClientEventKind::Unknown => return Err(DecodeError::UnknownEvent),
        ClientEventKind::Ping | ClientEventKind::ConversationList => DecodeError::Malformed,
        ClientEventKind::MessageSend => {
            check_format(&value)?;
            DecodeError::InvalidMessage
        }
        ClientEventKind::Typing => DecodeError::InvalidTyping,
        ClientEventKind::Thinking => DecodeError::InvalidThinking,
    };

    serde_json::from_value(value).map_err(|_| field_error)
}

/// Serializes an outbound event.
pub fn encode_event(event: &ServerEvent) -> Result<String, AppError> {
    Ok(serde_json::to_string(event)?)
}

/// A present, non-null `format` must name a known format.
fn check_format(value: &Value) -> Result<(), DecodeError> {
    match value.get("format") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(s)) if MessageFormat::parse(s).is_some() => Ok(()),
        Some(_) => Err(DecodeError::InvalidFormat),
    }
}
