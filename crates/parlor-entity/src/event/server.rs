//! Server → client events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use parlor_core::types::{ConversationId, MessageId, UserId};

use crate::approval::ApprovalRequest;
use crate::conversation::Conversation;
use crate::message::Message;
use crate::user::UserProfile;

/// Events the server pushes over the live channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Initial snapshot sent once after a successful handshake.
    #[serde(rename = "ready", rename_all = "camelCase")]
    Ready {
        user: UserProfile,
        conversations: Vec<Conversation>,
        /// Fixed for the lifetime of one server process.
        server_instance_id: Uuid,
    },
    #[serde(rename = "conversation:list")]
    ConversationList { conversations: Vec<Conversation> },
    #[serde(rename = "conversation:updated", rename_all = "camelCase")]
    ConversationUpdated {
        conversation_id: ConversationId,
        conversation: Conversation,
    },
    #[serde(rename = "message:created", rename_all = "camelCase")]
    MessageCreated {
        conversation_id: ConversationId,
        message: Message,
    },
    /// Direct reply to the channel that submitted a message.
    #[serde(rename = "message:ack", rename_all = "camelCase")]
    MessageAck {
        message: Message,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
    },
    #[serde(rename = "approval:updated")]
    ApprovalUpdated { request: ApprovalRequest },
    #[serde(rename = "presence:updated")]
    PresenceUpdated { user: UserProfile },
    #[serde(rename = "typing", rename_all = "camelCase")]
    Typing {
        conversation_id: ConversationId,
        user_id: UserId,
        display_name: String,
        typing: bool,
    },
    #[serde(rename = "thinking", rename_all = "camelCase")]
    Thinking {
        conversation_id: ConversationId,
        user_id: UserId,
        display_name: String,
        thinking: bool,
    },
    #[serde(rename = "read:receipt", rename_all = "camelCase")]
    ReadReceipt {
        conversation_id: ConversationId,
        user_id: UserId,
        message_id: MessageId,
        read_at: DateTime<Utc>,
    },
    #[serde(rename = "error")]
    Error { error: String },
    #[serde(rename = "pong")]
    Pong { ts: i64 },
}

impl ServerEvent {
    /// Builds an `error` envelope.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// The wire discriminant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::ConversationList { .. } => "conversation:list",
            Self::ConversationUpdated { .. } => "conversation:updated",
            Self::MessageCreated { .. } => "message:created",
            Self::MessageAck { .. } => "message:ack",
            Self::ApprovalUpdated { .. } => "approval:updated",
            Self::PresenceUpdated { .. } => "presence:updated",
            Self::Typing { .. } => "typing",
            Self::Thinking { .. } => "thinking",
            Self::ReadReceipt { .. } => "read:receipt",
            Self::Error { .. } => "error",
            Self::Pong { .. } => "pong",
        }
    }
}
