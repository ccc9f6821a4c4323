//! Per-conversation message cache with optimistic entries.
//!
//! A submit inserts a provisional entry keyed by a temporary id. That
//! entry is later either confirmed, which rekeys it in place under the
//! canonical id, or marked failed. Canonical ids are never cached twice,
//! whichever of the direct response and the fan-out arrives first.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use parlor_core::types::{ConversationId, MessageId, UserId};
use parlor_entity::{Message, MessageFormat, UserProfile};

/// Key of a cached message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum LocalId {
    /// Provisional id, `local-...`.
    Temp(String),
    /// Server-assigned id.
    Canonical(MessageId),
}

/// Delivery state of a cached message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Submitted, no answer yet.
    Sending,
    /// Stored by the server.
    Delivered,
    /// Rejected; kept for a manual retry.
    Failed,
}

/// A message as the client shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalMessage {
    pub id: LocalId,
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub content: String,
    pub format: MessageFormat,
    pub created_at: DateTime<Utc>,
    pub status: DeliveryStatus,
    /// Why the submit failed.
    pub error: Option<String>,
}

impl LocalMessage {
    fn delivered(message: Message) -> Self {
        Self {
            id: LocalId::Canonical(message.id),
            conversation_id: message.conversation_id,
            user_id: message.user_id,
            display_name: message.display_name,
            avatar_url: message.avatar_url,
            content: message.content,
            format: message.format,
            created_at: message.created_at,
            status: DeliveryStatus::Delivered,
            error: None,
        }
    }

    /// Server fields win; locally known display fields fill gaps.
    fn merge(&mut self, confirmed: Message) {
        let display_name = confirmed.display_name.or_else(|| self.display_name.take());
        let avatar_url = confirmed.avatar_url.or_else(|| self.avatar_url.take());
        *self = Self {
            display_name,
            avatar_url,
            ..Self::delivered(Message {
                display_name: None,
                avatar_url: None,
                ..confirmed
            })
        };
    }

    /// The canonical id, once delivered.
    pub fn canonical_id(&self) -> Option<MessageId> {
        match self.id {
            LocalId::Canonical(id) => Some(id),
            LocalId::Temp(_) => None,
        }
    }
}

/// Message lists in arrival order, per conversation.
#[derive(Debug, Default)]
pub struct MessageCache {
    conversations: HashMap<ConversationId, Vec<LocalMessage>>,
}

impl MessageCache {
    /// Appends a provisional entry authored by `author` and returns its
    /// temporary id.
    pub fn insert_provisional(
        &mut self,
        conversation_id: ConversationId,
        author: &UserProfile,
        content: String,
        format: MessageFormat,
    ) -> String {
        let temp = format!("local-{}", Uuid::new_v4());
        self.conversations
            .entry(conversation_id)
            .or_default()
            .push(LocalMessage {
                id: LocalId::Temp(temp.clone()),
                conversation_id,
                user_id: author.id,
                display_name: Some(author.label().to_string()),
                avatar_url: author.avatar_url.clone(),
                content,
                format,
                created_at: Utc::now(),
                status: DeliveryStatus::Sending,
                error: None,
            });
        temp
    }

    /// Resolves a provisional entry with the canonical record.
    ///
    /// When the fan-out copy is already cached the provisional entry is
    /// dropped and the cached copy updated; otherwise the provisional entry
    /// is rekeyed in place. Returns `false` if `temp_id` is unknown, in
    /// which case the record is ingested like a fan-out copy.
    pub fn confirm(&mut self, temp_id: &str, message: Message) -> bool {
        let list = self.conversations.entry(message.conversation_id).or_default();
        let temp_key = LocalId::Temp(temp_id.to_string());
        let canonical_key = LocalId::Canonical(message.id);

        let temp_pos = list.iter().position(|m| m.id == temp_key);
        let canonical_pos = list.iter().position(|m| m.id == canonical_key);

        match (temp_pos, canonical_pos) {
            (Some(temp), Some(canonical)) => {
                let mut merged = list.remove(temp);
                merged.merge(message);
                let canonical = if temp < canonical { canonical - 1 } else { canonical };
                list[canonical] = merged;
                true
            }
            (Some(temp), None) => {
                list[temp].merge(message);
                true
            }
            (None, Some(canonical)) => {
                list[canonical].merge(message);
                false
            }
            (None, None) => {
                list.push(LocalMessage::delivered(message));
                false
            }
        }
    }

    /// Marks a provisional entry failed. Returns `false` if it is gone.
    pub fn fail(&mut self, conversation_id: ConversationId, temp_id: &str, error: String) -> bool {
        let temp_key = LocalId::Temp(temp_id.to_string());
        let Some(entry) = self
            .conversations
            .get_mut(&conversation_id)
            .and_then(|list| list.iter_mut().find(|m| m.id == temp_key))
        else {
            return false;
        };
        entry.status = DeliveryStatus::Failed;
        entry.error = Some(error);
        true
    }

    /// Adds a fan-out copy unless its canonical id is already cached.
    /// Returns whether it was new.
    pub fn ingest(&mut self, message: Message) -> bool {
        let list = self.conversations.entry(message.conversation_id).or_default();
        let key = LocalId::Canonical(message.id);
        if list.iter().any(|m| m.id == key) {
            return false;
        }
        list.push(LocalMessage::delivered(message));
        true
    }

    /// Messages of one conversation in arrival order.
    pub fn list(&self, conversation_id: ConversationId) -> &[LocalMessage] {
        self.conversations
            .get(&conversation_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Position of a canonical id within its conversation.
    pub fn position(&self, conversation_id: ConversationId, id: MessageId) -> Option<usize> {
        let key = LocalId::Canonical(id);
        self.list(conversation_id).iter().position(|m| m.id == key)
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        self.conversations.clear();
    }
}
