//! In-process store backed by a single `RwLock`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use parlor_core::error::AppError;
use parlor_core::result::AppResult;
use parlor_core::types::{ConversationId, MessageId, UserId};
use parlor_entity::{
    AccountStatus, Conversation, ConversationKind, Member, MemberCapabilities, Message,
    NewMessage, PresenceStatus, ReadReceipt, UserProfile,
};

use crate::traits::{MembershipOracle, MessageStore, UserDirectory};

/// Stored shape of a conversation; members are joined with profiles on read.
#[derive(Debug, Clone)]
struct ConversationRecord {
    kind: ConversationKind,
    name: Option<String>,
    members: Vec<(UserId, MemberCapabilities)>,
    last_message: Option<String>,
    last_message_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<UserId, UserProfile>,
    conversations: HashMap<ConversationId, ConversationRecord>,
    messages: HashMap<ConversationId, Vec<Message>>,
    receipts: HashMap<(ConversationId, UserId), ReadReceipt>,
}

impl Inner {
    fn member_view(&self, user_id: UserId, capabilities: MemberCapabilities) -> Option<Member> {
        self.users
            .get(&user_id)
            .map(|user| Member::from_profile(user, capabilities))
    }

    fn conversation_view(&self, id: ConversationId, record: &ConversationRecord) -> Conversation {
        Conversation {
            id,
            kind: record.kind,
            name: record.name.clone(),
            members: record
                .members
                .iter()
                .filter_map(|(uid, caps)| self.member_view(*uid, *caps))
                .collect(),
            last_message: record.last_message.clone(),
            last_message_at: record.last_message_at,
            created_at: record.created_at,
        }
    }
}

/// Thread-safe in-memory implementation of every store trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a user.
    pub async fn insert_user(&self, user: UserProfile) -> UserProfile {
        let mut inner = self.inner.write().await;
        inner.users.insert(user.id, user.clone());
        user
    }

    /// Creates an active user with a display name.
    pub async fn create_user(&self, username: &str, display_name: &str) -> UserProfile {
        let mut user = UserProfile::new(UserId::new(), username);
        user.display_name = Some(display_name.to_string());
        self.insert_user(user).await
    }

    /// Changes an account's status.
    pub async fn set_account_status(&self, user_id: UserId, status: AccountStatus) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::not_found("User not found"))?;
        user.status = status;
        Ok(())
    }

    /// Creates a conversation with the given members.
    pub async fn create_conversation(
        &self,
        kind: ConversationKind,
        name: Option<&str>,
        members: &[(UserId, MemberCapabilities)],
    ) -> Conversation {
        let id = ConversationId::new();
        let record = ConversationRecord {
            kind,
            name: name.map(str::to_string),
            members: members.to_vec(),
            last_message: None,
            last_message_at: None,
            created_at: Utc::now(),
        };
        let mut inner = self.inner.write().await;
        let view = inner.conversation_view(id, &record);
        inner.conversations.insert(id, record);
        debug!(conversation_id = %id, members = members.len(), "Conversation created");
        view
    }

    /// Adds a member; a no-op if already present.
    pub async fn add_member(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
        capabilities: MemberCapabilities,
    ) -> AppResult<Conversation> {
        let mut inner = self.inner.write().await;
        let record = inner
            .conversations
            .get_mut(&conversation_id)
            .ok_or_else(|| AppError::not_found("Conversation not found"))?;
        if !record.members.iter().any(|(uid, _)| *uid == user_id) {
            record.members.push((user_id, capabilities));
        }
        let record = record.clone();
        Ok(inner.conversation_view(conversation_id, &record))
    }

    /// Removes a member.
    pub async fn remove_member(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> AppResult<Conversation> {
        let mut inner = self.inner.write().await;
        let record = inner
            .conversations
            .get_mut(&conversation_id)
            .ok_or_else(|| AppError::not_found("Conversation not found"))?;
        record.members.retain(|(uid, _)| *uid != user_id);
        let record = record.clone();
        Ok(inner.conversation_view(conversation_id, &record))
    }

    /// Message history of a conversation, oldest first.
    pub async fn history(&self, conversation_id: ConversationId) -> Vec<Message> {
        self.inner
            .read()
            .await
            .messages
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    /// All read receipts recorded for a conversation.
    pub async fn receipts(&self, conversation_id: ConversationId) -> Vec<ReadReceipt> {
        self.inner
            .read()
            .await
            .receipts
            .iter()
            .filter(|((cid, _), _)| *cid == conversation_id)
            .map(|(_, receipt)| receipt.clone())
            .collect()
    }
}

#[async_trait]
impl MembershipOracle for MemoryStore {
    async fn members(&self, conversation_id: ConversationId) -> AppResult<Vec<Member>> {
        let inner = self.inner.read().await;
        Ok(inner
            .conversations
            .get(&conversation_id)
            .map(|record| {
                record
                    .members
                    .iter()
                    .filter_map(|(uid, caps)| inner.member_view(*uid, *caps))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn is_member(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> AppResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .conversations
            .get(&conversation_id)
            .is_some_and(|record| record.members.iter().any(|(uid, _)| *uid == user_id)))
    }

    async fn conversations_for_user(&self, user_id: UserId) -> AppResult<Vec<Conversation>> {
        let inner = self.inner.read().await;
        let mut list: Vec<Conversation> = inner
            .conversations
            .iter()
            .filter(|(_, record)| record.members.iter().any(|(uid, _)| *uid == user_id))
            .map(|(id, record)| inner.conversation_view(*id, record))
            .collect();
        list.sort_by(|a, b| {
            b.last_message_at
                .unwrap_or(b.created_at)
                .cmp(&a.last_message_at.unwrap_or(a.created_at))
        });
        Ok(list)
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<UserProfile>> {
        Ok(self.inner.read().await.users.get(&user_id).cloned())
    }

    async fn set_presence(
        &self,
        user_id: UserId,
        status: PresenceStatus,
        last_seen_at: Option<DateTime<Utc>>,
    ) -> AppResult<UserProfile> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::not_found("User not found"))?;
        user.presence_status = status;
        if let Some(seen) = last_seen_at {
            user.last_seen_at = Some(seen);
        }
        Ok(user.clone())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append_message(&self, message: NewMessage) -> AppResult<Message> {
        let mut inner = self.inner.write().await;
        let author = inner
            .users
            .get(&message.user_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("User not found"))?;
        let record = inner
            .conversations
            .get_mut(&message.conversation_id)
            .ok_or_else(|| AppError::not_found("Conversation not found"))?;

        let stored = Message {
            id: MessageId::from_uuid(Uuid::now_v7()),
            conversation_id: message.conversation_id,
            user_id: message.user_id,
            display_name: Some(author.label().to_string()),
            avatar_url: author.avatar_url.clone(),
            content: message.content,
            format: message.format,
            created_at: Utc::now(),
        };
        record.last_message = Some(stored.content.clone());
        record.last_message_at = Some(stored.created_at);

        inner
            .messages
            .entry(message.conversation_id)
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn mark_read(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
        message_id: MessageId,
    ) -> AppResult<ReadReceipt> {
        let mut inner = self.inner.write().await;
        let known = inner
            .messages
            .get(&conversation_id)
            .is_some_and(|log| log.iter().any(|m| m.id == message_id));
        if !known {
            return Err(AppError::not_found("Message not found"));
        }
        let receipt = ReadReceipt {
            conversation_id,
            user_id,
            message_id,
            read_at: Utc::now(),
        };
        inner
            .receipts
            .insert((conversation_id, user_id), receipt.clone());
        Ok(receipt)
    }
}
