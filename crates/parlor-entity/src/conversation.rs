//! Conversation and membership records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parlor_core::types::{ConversationId, UserId};

use crate::presence::PresenceStatus;
use crate::user::UserProfile;

/// Kind of conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    /// One-to-one conversation.
    Direct,
    /// Multi-member room.
    Room,
}

/// What a member may emit or consume beyond ordinary messages.
///
/// Read receipts and agent "thinking" signals are gated per member
/// rather than per account kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberCapabilities {
    /// May publish read receipts for this conversation.
    #[serde(default)]
    pub emits_read_receipts: bool,
    /// Receives read receipts published by others.
    #[serde(default = "default_true")]
    pub consumes_read_receipts: bool,
    /// May drive the "thinking" signal through the HTTP trigger.
    #[serde(default)]
    pub signals_thinking: bool,
}

impl MemberCapabilities {
    /// Capabilities of an ordinary human member.
    pub fn standard() -> Self {
        Self {
            emits_read_receipts: false,
            consumes_read_receipts: true,
            signals_thinking: false,
        }
    }

    /// Capabilities of an automated agent member.
    pub fn agent() -> Self {
        Self {
            emits_read_receipts: true,
            consumes_read_receipts: true,
            signals_thinking: true,
        }
    }
}

impl Default for MemberCapabilities {
    fn default() -> Self {
        Self::standard()
    }
}

/// One member of a conversation, with the profile fields needed for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Member user ID.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Presence at the time of the read.
    #[serde(default)]
    pub presence_status: PresenceStatus,
    /// Whether the member is an automated agent.
    #[serde(default)]
    pub bot: bool,
    /// Capability flags.
    #[serde(default)]
    pub capabilities: MemberCapabilities,
}

impl Member {
    /// Builds a member record from a profile.
    pub fn from_profile(user: &UserProfile, capabilities: MemberCapabilities) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
            presence_status: user.presence_status,
            bot: user.bot,
            capabilities,
        }
    }

    /// Copies the presence-related fields of an updated profile.
    pub fn apply_profile(&mut self, user: &UserProfile) {
        self.display_name = user.display_name.clone();
        self.avatar_url = user.avatar_url.clone();
        self.presence_status = user.presence_status;
    }
}

/// A conversation as listed to one of its members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Conversation ID.
    pub id: ConversationId,
    /// Direct or room.
    pub kind: ConversationKind,
    /// Room name (direct conversations have none).
    #[serde(default)]
    pub name: Option<String>,
    /// Members at the time of the read.
    #[serde(default)]
    pub members: Vec<Member>,
    /// Preview of the latest message.
    #[serde(default)]
    pub last_message: Option<String>,
    /// Timestamp of the latest message.
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Whether `user_id` appears in the embedded member list.
    pub fn has_member(&self, user_id: UserId) -> bool {
        self.members.iter().any(|m| m.id == user_id)
    }
}

fn default_true() -> bool {
    true
}
