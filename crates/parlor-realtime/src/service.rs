//! Domain actions shared by the live channel and the HTTP triggers.

use std::sync::Arc;

use tracing::{info, warn};

use parlor_core::config::RealtimeConfig;
use parlor_core::error::AppError;
use parlor_core::result::AppResult;
use parlor_core::types::{ConversationId, MessageId, UserId};
use parlor_entity::{Member, Message, MessageFormat, NewMessage, ReadReceipt};
use parlor_store::ChatStore;

use crate::dispatch::dispatcher::EventDispatcher;
use crate::ephemeral::signal::{Signal, SignalKind};
use crate::ephemeral::tracker::EphemeralTracker;
use crate::message::validator::normalize_content;

/// Chat actions: message submission, signals, read receipts.
pub struct ChatService {
    store: Arc<dyn ChatStore>,
    dispatcher: Arc<EventDispatcher>,
    signals: Arc<EphemeralTracker>,
    config: RealtimeConfig,
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService").finish()
    }
}

impl ChatService {
    /// Creates a new service.
    pub fn new(
        store: Arc<dyn ChatStore>,
        dispatcher: Arc<EventDispatcher>,
        signals: Arc<EphemeralTracker>,
        config: RealtimeConfig,
    ) -> Self {
        Self {
            store,
            dispatcher,
            signals,
            config,
        }
    }

    /// Validates, persists, then publishes a message.
    ///
    /// Publication starts only after the append returned, so every
    /// recipient can re-read history and find the message. A failed append
    /// publishes nothing.
    pub async fn send_message(
        &self,
        user_id: UserId,
        conversation_id: ConversationId,
        content: &str,
        format: MessageFormat,
    ) -> AppResult<Message> {
        let content = normalize_content(content, self.config.max_message_chars)
            .ok_or_else(|| AppError::validation("Invalid message payload"))?;
        self.require_member(conversation_id, user_id).await?;

        let message = self
            .store
            .append_message(NewMessage {
                conversation_id,
                user_id,
                content,
                format,
            })
            .await?;

        if let Err(e) = self.dispatcher.message_created(&message).await {
            warn!(
                conversation_id = %conversation_id,
                message_id = %message.id,
                error = %e,
                "Stored message could not be published"
            );
        }

        info!(
            conversation_id = %conversation_id,
            user_id = %user_id,
            message_id = %message.id,
            "Message sent"
        );
        Ok(message)
    }

    /// Starts or stops an ephemeral signal for a member.
    pub async fn set_signal(
        &self,
        user_id: UserId,
        display_name: &str,
        conversation_id: ConversationId,
        kind: SignalKind,
        active: bool,
    ) -> AppResult<()> {
        self.require_member(conversation_id, user_id).await?;
        if active {
            self.signals
                .start(Signal {
                    conversation_id,
                    user_id,
                    display_name: display_name.to_string(),
                    kind,
                })
                .await;
        } else {
            self.signals.stop(conversation_id, user_id, kind).await;
        }
        Ok(())
    }

    /// Thinking signal from an agent; requires the thinking capability.
    pub async fn agent_thinking(
        &self,
        user_id: UserId,
        display_name: &str,
        conversation_id: ConversationId,
        thinking: bool,
    ) -> AppResult<()> {
        let member = self.membership(conversation_id, user_id).await?;
        if !member.capabilities.signals_thinking {
            return Err(AppError::authorization("Thinking signals are not enabled for this member"));
        }
        self.set_signal(user_id, display_name, conversation_id, SignalKind::Thinking, thinking)
            .await
    }

    /// Records a read marker and relays it to members that consume receipts.
    pub async fn mark_read(
        &self,
        user_id: UserId,
        conversation_id: ConversationId,
        message_id: MessageId,
    ) -> AppResult<ReadReceipt> {
        let member = self.membership(conversation_id, user_id).await?;
        if !member.capabilities.emits_read_receipts {
            return Err(AppError::authorization("Read receipts are not enabled for this member"));
        }

        let receipt = self.store.mark_read(conversation_id, user_id, message_id).await?;
        if let Err(e) = self.dispatcher.read_receipt(&receipt).await {
            warn!(
                conversation_id = %conversation_id,
                message_id = %message_id,
                error = %e,
                "Read receipt could not be relayed"
            );
        }
        Ok(receipt)
    }

    async fn require_member(&self, conversation_id: ConversationId, user_id: UserId) -> AppResult<()> {
        if self.store.is_member(conversation_id, user_id).await? {
            Ok(())
        } else {
            Err(AppError::not_found("Conversation not found"))
        }
    }

    async fn membership(&self, conversation_id: ConversationId, user_id: UserId) -> AppResult<Member> {
        self.store
            .members(conversation_id)
            .await?
            .into_iter()
            .find(|member| member.id == user_id)
            .ok_or_else(|| AppError::not_found("Conversation not found"))
    }
}
