//! Read receipt record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parlor_core::types::{ConversationId, MessageId, UserId};

/// The latest message a member has read in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    /// Conversation.
    pub conversation_id: ConversationId,
    /// Reader.
    pub user_id: UserId,
    /// Last message read.
    pub message_id: MessageId,
    /// When it was recorded.
    pub read_at: DateTime<Utc>,
}
