//! Everything the client knows about the server side.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use parlor_core::types::{ConversationId, MessageId, UserId};
use parlor_entity::{ApprovalRequest, Conversation, Message, ReadReceipt, UserProfile};

use super::messages::{LocalMessage, MessageCache};
use crate::signals::mirror::{IndicatorKind, SignalMirror};

/// Read state of a message the local user sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadStatus {
    /// No reader has reached it yet.
    Sent,
    /// A reader's marker is at or past it.
    Seen,
}

/// Client-side mirror of the server state, owned by the supervisor and
/// readable through [`ChatClient::inspect`](crate::ChatClient::inspect).
#[derive(Debug, Default)]
pub struct ClientState {
    pub(crate) user: Option<UserProfile>,
    pub(crate) conversations: Vec<Conversation>,
    pub(crate) approvals: Vec<ApprovalRequest>,
    pub(crate) receipts: HashMap<ConversationId, HashMap<UserId, ReadReceipt>>,
    pub(crate) messages: MessageCache,
    pub(crate) signals: SignalMirror,
    pub(crate) server_instance_id: Option<Uuid>,
}

impl ClientState {
    /// The signed-in user, once `ready` arrived.
    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn approvals(&self) -> &[ApprovalRequest] {
        &self.approvals
    }

    /// Cached messages of a conversation in arrival order.
    pub fn messages(&self, conversation_id: ConversationId) -> &[LocalMessage] {
        self.messages.list(conversation_id)
    }

    /// Indicator line for a conversation, if anyone is typing/thinking.
    pub fn indicator(&self, conversation_id: ConversationId, kind: IndicatorKind) -> Option<String> {
        self.signals.summary(conversation_id, kind)
    }

    /// Number of mirrored signals across all conversations.
    pub fn active_signals(&self) -> usize {
        self.signals.len()
    }

    /// Identifier of the server process the current snapshot came from.
    pub fn server_instance_id(&self) -> Option<Uuid> {
        self.server_instance_id
    }

    /// `None` unless the message was sent by the local user. `Seen` once
    /// any reader's latest receipt points at this message or a later one.
    pub fn read_status(&self, conversation_id: ConversationId, message_id: MessageId) -> Option<ReadStatus> {
        let me = self.user.as_ref()?.id;
        let index = self.messages.position(conversation_id, message_id)?;
        if self.messages.list(conversation_id)[index].user_id != me {
            return None;
        }

        let Some(receipts) = self.receipts.get(&conversation_id).filter(|r| !r.is_empty()) else {
            return Some(ReadStatus::Sent);
        };
        let seen = receipts.values().any(|receipt| {
            self.messages
                .position(conversation_id, receipt.message_id)
                .is_some_and(|read| read >= index)
        });
        Some(if seen { ReadStatus::Seen } else { ReadStatus::Sent })
    }

    /// Applies a `ready` snapshot. Returns `true` when it came from a
    /// different server process than the previous one, in which case every
    /// cache was discarded first.
    pub(crate) fn apply_ready(
        &mut self,
        user: UserProfile,
        conversations: Vec<Conversation>,
        server_instance_id: Uuid,
    ) -> bool {
        let restarted = self
            .server_instance_id
            .is_some_and(|previous| previous != server_instance_id);
        if restarted {
            self.clear();
        }
        self.signals.clear();
        self.server_instance_id = Some(server_instance_id);
        self.user = Some(user);
        self.conversations = conversations;
        restarted
    }

    pub(crate) fn upsert_conversation(&mut self, conversation: Conversation) {
        match self.conversations.iter_mut().find(|c| c.id == conversation.id) {
            Some(existing) => *existing = conversation,
            None => self.conversations.push(conversation),
        }
    }

    pub(crate) fn apply_presence(&mut self, profile: UserProfile) {
        for member in self
            .conversations
            .iter_mut()
            .flat_map(|c| c.members.iter_mut())
            .filter(|m| m.id == profile.id)
        {
            member.apply_profile(&profile);
        }
        if self.user.as_ref().is_some_and(|me| me.id == profile.id) {
            self.user = Some(profile);
        }
    }

    pub(crate) fn upsert_approval(&mut self, request: ApprovalRequest) {
        match self.approvals.iter_mut().find(|r| r.id == request.id) {
            Some(existing) => *existing = request,
            None => self.approvals.push(request),
        }
    }

    pub(crate) fn record_receipt(&mut self, receipt: ReadReceipt) {
        self.receipts
            .entry(receipt.conversation_id)
            .or_default()
            .insert(receipt.user_id, receipt);
    }

    /// Caches a fan-out copy and refreshes the conversation preview.
    pub(crate) fn record_message(&mut self, message: Message) {
        self.touch_conversation(&message);
        self.messages.ingest(message);
    }

    pub(crate) fn touch_conversation(&mut self, message: &Message) {
        if let Some(conversation) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == message.conversation_id)
        {
            conversation.last_message = Some(message.content.clone());
            conversation.last_message_at = Some(message.created_at);
        }
    }

    /// Discards every cache and mirrored signal.
    pub(crate) fn clear(&mut self) {
        self.user = None;
        self.conversations.clear();
        self.approvals.clear();
        self.receipts.clear();
        self.messages.clear();
        self.signals.clear();
        self.server_instance_id = None;
    }
}
