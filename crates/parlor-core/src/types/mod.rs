//! Shared value types.

pub mod id;

pub use id::{ApprovalId, ConnectionId, ConversationId, MessageId, UserId};
