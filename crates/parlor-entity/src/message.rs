//! Chat message records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parlor_core::types::{ConversationId, MessageId, UserId};

/// Rendering format of a message body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    /// Plain text.
    #[default]
    Text,
    /// Markdown.
    Markdown,
}

impl MessageFormat {
    /// Parses a wire value; `None` for anything other than `text`/`markdown`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }
}

/// A stored message, identified by its canonical id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Canonical message ID.
    pub id: MessageId,
    /// Conversation the message belongs to.
    pub conversation_id: ConversationId,
    /// Author.
    pub user_id: UserId,
    /// Author display name at send time.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Author avatar at send time.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Message body.
    pub content: String,
    /// Body format.
    #[serde(default)]
    pub format: MessageFormat,
    /// Storage timestamp.
    pub created_at: DateTime<Utc>,
}

/// Data required to append a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    /// Target conversation.
    pub conversation_id: ConversationId,
    /// Author.
    pub user_id: UserId,
    /// Already trimmed and length-limited body.
    pub content: String,
    /// Body format.
    pub format: MessageFormat,
}
