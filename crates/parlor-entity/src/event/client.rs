//! Client → server events.

use serde::{Deserialize, Serialize};

use parlor_core::types::ConversationId;

use crate::message::MessageFormat;

/// Events a client may send over the live channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Liveness probe; answered with `pong`.
    #[serde(rename = "ping")]
    Ping,
    /// Requests the caller's current conversation list.
    #[serde(rename = "conversation:list")]
    ConversationList,
    /// Submits a chat message.
    #[serde(rename = "message:send", rename_all = "camelCase")]
    MessageSend {
        conversation_id: ConversationId,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<MessageFormat>,
        /// Opaque client token echoed back in `message:ack`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
    },
    /// Starts or stops the sender's typing signal.
    #[serde(rename = "typing", rename_all = "camelCase")]
    Typing {
        conversation_id: ConversationId,
        #[serde(default)]
        typing: bool,
    },
    /// Starts or stops the sender's thinking signal.
    #[serde(rename = "thinking", rename_all = "camelCase")]
    Thinking {
        conversation_id: ConversationId,
        #[serde(default)]
        thinking: bool,
    },
}

/// The bare discriminant of a [`ClientEvent`], used to report field errors
/// against the right event before the full payload is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ClientEventKind {
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "conversation:list")]
    ConversationList,
    #[serde(rename = "message:send")]
    MessageSend,
    #[serde(rename = "typing")]
    Typing,
    #[serde(rename = "thinking")]
    Thinking,
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_send_wire_shape() {
        let id = ConversationId::new();
        let event = ClientEvent::MessageSend {
            conversation_id: id,
            content: "hi".to_string(),
            format: Some(MessageFormat::Markdown),
            client_id: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "message:send");
        assert_eq!(json["conversationId"], id.to_string());
        assert_eq!(json["format"], "markdown");
        assert!(json.get("clientId").is_none());
    }

    #[test]
    fn test_typing_flag_defaults_to_false() {
        let id = ConversationId::new();
        let raw = format!(r#"{{"type":"typing","conversationId":"{id}"}}"#);
        let event: ClientEvent = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            event,
            ClientEvent::Typing {
                conversation_id: id,
                typing: false
            }
        );
    }

    #[test]
    fn test_unrecognised_kind() {
        let kind: ClientEventKind = serde_json::from_str(r#""message:delete""#).unwrap();
        assert_eq!(kind, ClientEventKind::Unknown);
    }
}
