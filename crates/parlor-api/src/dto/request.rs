//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use parlor_core::types::MessageId;
use parlor_entity::{MessageFormat, PresenceStatus};

/// Body of `POST /api/conversations/{id}/messages`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendMessageRequest {
    /// Message text. Trimmed and truncated by the service.
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    /// Rendering format; `text` when absent.
    #[serde(default)]
    pub format: Option<MessageFormat>,
}

/// Body of `POST /api/conversations/{id}/thinking`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkingRequest {
    /// Start or stop.
    pub thinking: bool,
}

/// Body of `POST /api/conversations/{id}/read`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadRequest {
    /// Newest message the caller has read.
    pub message_id: MessageId,
}

/// Body of `PUT /api/users/me/presence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceRequest {
    /// Requested status.
    pub status: PresenceStatus,
}
