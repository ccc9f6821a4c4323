//! Event dispatcher: resolves recipients through the membership oracle and
//! delivers through the connection registry.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use parlor_core::result::AppResult;
use parlor_core::types::{ConversationId, UserId};
use parlor_entity::{ApprovalRequest, Conversation, Member, Message, ReadReceipt, ServerEvent, UserProfile};
use parlor_store::ChatStore;

use crate::connection::registry::ConnectionRegistry;
use crate::ephemeral::signal::{Signal, SignalKind, SignalRelay};
use crate::message::codec::encode_event;

/// Fans domain events out to the right connections.
///
/// Conversation-scoped events read a fresh membership snapshot for every
/// call; nothing about membership is cached here. Delivery never waits on
/// a recipient.
#[derive(Clone)]
pub struct EventDispatcher {
    registry: Arc<ConnectionRegistry>,
    store: Arc<dyn ChatStore>,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher").finish()
    }
}

impl EventDispatcher {
    /// Creates a new dispatcher.
    pub fn new(registry: Arc<ConnectionRegistry>, store: Arc<dyn ChatStore>) -> Self {
        Self { registry, store }
    }

    /// Delivers `event` to every current member of the conversation.
    ///
    /// Returns the number of connections that accepted the event. Fails
    /// only if the membership snapshot cannot be read, in which case
    /// nothing was delivered.
    pub async fn publish(&self, conversation_id: ConversationId, event: &ServerEvent) -> AppResult<usize> {
        self.publish_filtered(conversation_id, event, |_| true).await
    }

    /// Like [`publish`](Self::publish) but skips one user.
    pub async fn publish_except(
        &self,
        conversation_id: ConversationId,
        except: UserId,
        event: &ServerEvent,
    ) -> AppResult<usize> {
        self.publish_filtered(conversation_id, event, |member| member.id != except)
            .await
    }

    /// Delivers to the members of the snapshot accepted by `include`.
    pub async fn publish_filtered<F>(
        &self,
        conversation_id: ConversationId,
        event: &ServerEvent,
        include: F,
    ) -> AppResult<usize>
    where
        F: Fn(&Member) -> bool + Send,
    {
        let members = self.store.members(conversation_id).await?;
        let payload = encode_event(event)?;
        let recipients: Vec<UserId> = members
            .iter()
            .filter(|&member| include(member))
            .map(|member| member.id)
            .collect();
        let delivered = self.send_payload(&recipients, &payload);

        debug!(
            conversation_id = %conversation_id,
            kind = event.kind(),
            members = members.len(),
            recipients = recipients.len(),
            delivered,
            "Event published"
        );
        Ok(delivered)
    }

    /// Delivers to an explicit set of users.
    pub fn send_to_users(&self, user_ids: &[UserId], event: &ServerEvent) -> usize {
        match encode_event(event) {
            Ok(payload) => self.send_payload(user_ids, &payload),
            Err(e) => {
                error!(kind = event.kind(), error = %e, "Failed to serialize event");
                0
            }
        }
    }

    /// Delivers to every open connection.
    pub fn broadcast(&self, event: &ServerEvent) -> usize {
        match encode_event(event) {
            Ok(payload) => self.registry.broadcast_all(&payload),
            Err(e) => {
                error!(kind = event.kind(), error = %e, "Failed to serialize event");
                0
            }
        }
    }

    fn send_payload(&self, user_ids: &[UserId], payload: &str) -> usize {
        user_ids
            .iter()
            .map(|user_id| self.registry.send_to_user(*user_id, payload))
            .sum()
    }

    /// Publishes `message:created`. The message must already be durable.
    pub async fn message_created(&self, message: &Message) -> AppResult<usize> {
        let event = ServerEvent::MessageCreated {
            conversation_id: message.conversation_id,
            message: message.clone(),
        };
        self.publish(message.conversation_id, &event).await
    }

    /// Publishes `conversation:updated` to the members embedded in the
    /// record, or to the membership snapshot when the record has none.
    pub async fn conversation_updated(&self, conversation: &Conversation) -> AppResult<usize> {
        let event = ServerEvent::ConversationUpdated {
            conversation_id: conversation.id,
            conversation: conversation.clone(),
        };
        if conversation.members.is_empty() {
            return self.publish(conversation.id, &event).await;
        }
        let recipients: Vec<UserId> = conversation.members.iter().map(|m| m.id).collect();
        Ok(self.send_to_users(&recipients, &event))
    }

    /// Sends `approval:updated` to the requester and the target.
    pub fn approval_updated(&self, request: &ApprovalRequest) -> usize {
        let event = ServerEvent::ApprovalUpdated {
            request: request.clone(),
        };
        let parties = request.parties();
        if parties[0] == parties[1] {
            return self.send_to_users(&parties[..1], &event);
        }
        self.send_to_users(&parties, &event)
    }

    /// Broadcasts a presence change to every connection.
    pub fn presence_updated(&self, user: &UserProfile) -> usize {
        self.broadcast(&ServerEvent::PresenceUpdated { user: user.clone() })
    }

    /// Relays a read receipt to the other members that consume receipts.
    pub async fn read_receipt(&self, receipt: &ReadReceipt) -> AppResult<usize> {
        let event = ServerEvent::ReadReceipt {
            conversation_id: receipt.conversation_id,
            user_id: receipt.user_id,
            message_id: receipt.message_id,
            read_at: receipt.read_at,
        };
        let reader = receipt.user_id;
        self.publish_filtered(receipt.conversation_id, &event, |member| {
            member.id != reader && member.capabilities.consumes_read_receipts
        })
        .await
    }
}

#[async_trait]
impl SignalRelay for EventDispatcher {
    async fn relay(&self, signal: &Signal, active: bool) {
        let event = match signal.kind {
            SignalKind::Typing => ServerEvent::Typing {
                conversation_id: signal.conversation_id,
                user_id: signal.user_id,
                display_name: signal.display_name.clone(),
                typing: active,
            },
            SignalKind::Thinking => ServerEvent::Thinking {
                conversation_id: signal.conversation_id,
                user_id: signal.user_id,
                display_name: signal.display_name.clone(),
                thinking: active,
            },
        };
        if let Err(e) = self
            .publish_except(signal.conversation_id, signal.user_id, &event)
            .await
        {
            warn!(
                conversation_id = %signal.conversation_id,
                user_id = %signal.user_id,
                kind = signal.kind.as_str(),
                error = %e,
                "Failed to relay signal"
            );
        }
    }
}
