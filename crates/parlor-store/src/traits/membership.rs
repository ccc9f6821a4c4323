//! Membership lookup.

use async_trait::async_trait;

use parlor_core::result::AppResult;
use parlor_core::types::{ConversationId, UserId};
use parlor_entity::{Conversation, Member};

/// Answers "who belongs to this conversation right now".
///
/// Results are read fresh for every dispatch and never cached by the
/// real-time engine.
#[async_trait]
pub trait MembershipOracle: Send + Sync + 'static {
    /// Current members of a conversation. Unknown conversations yield an
    /// empty list.
    async fn members(&self, conversation_id: ConversationId) -> AppResult<Vec<Member>>;

    /// Whether `user_id` currently belongs to `conversation_id`.
    async fn is_member(&self, conversation_id: ConversationId, user_id: UserId)
    -> AppResult<bool>;

    /// Conversations the user belongs to, with members embedded.
    async fn conversations_for_user(&self, user_id: UserId) -> AppResult<Vec<Conversation>>;
}
