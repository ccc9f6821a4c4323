//! Message and read-receipt persistence.

use async_trait::async_trait;

use parlor_core::result::AppResult;
use parlor_core::types::{ConversationId, MessageId, UserId};
use parlor_entity::{Message, NewMessage, ReadReceipt};

/// Append-only message log plus per-member read markers.
#[async_trait]
pub trait MessageStore: Send + Sync + 'static {
    /// Appends a message and returns the stored record with its canonical id.
    ///
    /// The write is durable when this returns.
    async fn append_message(&self, message: NewMessage) -> AppResult<Message>;

    /// Records that `user_id` has read up to `message_id`.
    async fn mark_read(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
        message_id: MessageId,
    ) -> AppResult<ReadReceipt>;
}
