//! Signal keys, kinds, and the relay seam.

use async_trait::async_trait;

use parlor_core::types::{ConversationId, UserId};

/// The two kinds of ephemeral signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Typing,
    Thinking,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Typing => "typing",
            Self::Thinking => "thinking",
        }
    }
}

/// One live signal, as relayed to other members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub display_name: String,
    pub kind: SignalKind,
}

/// Outcome of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalTransition {
    /// The entry was absent and is now active.
    Started,
    /// The entry was already active; its timer was replaced.
    Refreshed,
}

/// Delivers signal transitions to the other members of a conversation.
#[async_trait]
pub trait SignalRelay: Send + Sync + 'static {
    /// Relays `signal` as active or inactive. Never echoed to the signal's
    /// own user.
    async fn relay(&self, signal: &Signal, active: bool);
}
