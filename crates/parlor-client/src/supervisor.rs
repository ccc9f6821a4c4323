//! The task behind a [`ChatClient`](crate::ChatClient).
//!
//! Every state change goes through one mailbox: caller commands, inbound
//! frames, timer expiries and submit results. Frames and timers carry the
//! generation they were armed under and are ignored once it is stale, so a
//! replaced channel or a cancelled reconnect can never act late.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use parlor_core::AppError;
use parlor_core::AppResult;
use parlor_core::config::ClientConfig;
use parlor_core::timer::ExpiryTimer;
use parlor_core::types::{ConversationId, UserId};
use parlor_entity::{ClientEvent, Message, MessageFormat, ReadReceipt, ServerEvent};

use crate::cache::state::ClientState;
use crate::client::{ClientNotice, LinkState};
use crate::signals::mirror::{IndicatorKind, SignalKey};
use crate::signals::self_typing::SelfTyping;
use crate::transport::http::MessageSubmitter;
use crate::transport::{ChannelEvent, ChannelWriter, Connector, TransportError};

/// Close code the server uses for a rejected handshake.
const HANDSHAKE_REJECTED: u16 = 4001;

pub(crate) type Inspector = Box<dyn FnOnce(&ClientState, LinkState) + Send>;

pub(crate) enum Command {
    Login(String),
    Logout,
    Send {
        conversation_id: ConversationId,
        content: String,
        format: MessageFormat,
        reply: oneshot::Sender<AppResult<String>>,
    },
    NotifyTyping(ConversationId),
    ResetTyping,
    RefreshConversations,
    Ping,
    Inspect(Inspector),

    Inbound {
        generation: u64,
        event: ChannelEvent,
    },
    Reconnect {
        generation: u64,
    },
    Submitted {
        epoch: u64,
        conversation_id: ConversationId,
        temp_id: String,
        result: Result<Message, TransportError>,
    },
    SignalExpired {
        key: SignalKey,
        generation: u64,
    },
    TypingIdle {
        generation: u64,
    },
}

enum Link {
    Idle,
    Connected(ChannelWriter),
    Waiting(ExpiryTimer),
}

pub(crate) struct Supervisor {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    submitter: Arc<dyn MessageSubmitter>,
    commands: mpsc::UnboundedReceiver<Command>,
    mailbox: mpsc::WeakUnboundedSender<Command>,
    notices: mpsc::UnboundedSender<ClientNotice>,

    token: Option<String>,
    /// Bumped whenever the current channel or reconnect timer is replaced.
    generation: u64,
    /// Bumped whenever the message cache is discarded.
    epoch: u64,
    link: Link,
    state: ClientState,
    self_typing: SelfTyping,
}

impl Supervisor {
    pub(crate) fn new(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        submitter: Arc<dyn MessageSubmitter>,
        commands: mpsc::UnboundedReceiver<Command>,
        mailbox: mpsc::WeakUnboundedSender<Command>,
        notices: mpsc::UnboundedSender<ClientNotice>,
    ) -> Self {
        Self {
            config,
            connector,
            submitter,
            commands,
            mailbox,
            notices,
            token: None,
            generation: 0,
            epoch: 0,
            link: Link::Idle,
            state: ClientState::default(),
            self_typing: SelfTyping::default(),
        }
    }

    /// Runs until every [`ChatClient`](crate::ChatClient) handle is dropped.
    pub(crate) async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            self.handle(command).await;
        }
        self.close_link().await;
        debug!("Client supervisor stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Login(token) => {
                self.token = Some(token);
                self.open().await;
            }
            Command::Logout => self.logout().await,
            Command::Send {
                conversation_id,
                content,
                format,
                reply,
            } => {
                let _ = reply.send(self.send_message(conversation_id, content, format));
            }
            Command::NotifyTyping(conversation_id) => self.notify_typing(conversation_id),
            Command::ResetTyping => {
                if let Some(conversation_id) = self.self_typing.reset() {
                    self.send_event(&ClientEvent::Typing {
                        conversation_id,
                        typing: false,
                    });
                }
            }
            Command::RefreshConversations => {
                self.send_event(&ClientEvent::ConversationList);
            }
            Command::Ping => {
                self.send_event(&ClientEvent::Ping);
            }
            Command::Inspect(inspect) => inspect(&self.state, self.link_state()),
            Command::Inbound { generation, event } => {
                if generation != self.generation {
                    trace!(generation, "Dropping event from a replaced channel");
                    return;
                }
                match event {
                    ChannelEvent::Frame(raw) => self.on_frame(&raw),
                    ChannelEvent::Closed { code, reason } => self.on_closed(code, reason),
                }
            }
            Command::Reconnect { generation } => {
                if generation == self.generation && matches!(self.link, Link::Waiting(_)) {
                    self.open().await;
                }
            }
            Command::Submitted {
                epoch,
                conversation_id,
                temp_id,
                result,
            } => {
                if epoch == self.epoch {
                    self.on_submitted(conversation_id, temp_id, result);
                }
            }
            Command::SignalExpired { key, generation } => {
                self.state.signals.expire(key, generation);
            }
            Command::TypingIdle { generation } => {
                if let Some(conversation_id) = self.self_typing.idle(generation) {
                    self.send_event(&ClientEvent::Typing {
                        conversation_id,
                        typing: false,
                    });
                }
            }
        }
    }

    fn link_state(&self) -> LinkState {
        match self.link {
            Link::Idle => LinkState::Offline,
            Link::Connected(_) => LinkState::Connected,
            Link::Waiting(_) => LinkState::Reconnecting,
        }
    }

    fn notify(&self, notice: ClientNotice) {
        let _ = self.notices.send(notice);
    }

    // ── Channel lifecycle ──────────────────────────────────────────

    /// Replaces whatever link exists with a fresh channel. The previous
    /// channel is fully closed before the new one is opened.
    async fn open(&mut self) {
        let Some(token) = self.token.clone() else {
            return;
        };
        self.close_link().await;
        self.generation += 1;
        let generation = self.generation;

        match self.connector.connect(&token).await {
            Ok(channel) => {
                let (writer, inbound) = channel.split();
                self.spawn_pump(generation, inbound);
                self.link = Link::Connected(writer);
                info!(generation, "Live channel open");
            }
            Err(e) => {
                warn!(generation, error = %e, "Live channel connect failed");
                self.notify(ClientNotice::Disconnected {
                    code: None,
                    reason: e.to_string(),
                });
                self.schedule_reconnect();
            }
        }
    }

    fn spawn_pump(&self, generation: u64, mut inbound: mpsc::UnboundedReceiver<ChannelEvent>) {
        let mailbox = self.mailbox.clone();
        tokio::spawn(async move {
            let mut closed = false;
            while let Some(event) = inbound.recv().await {
                closed = matches!(event, ChannelEvent::Closed { .. });
                let Some(tx) = mailbox.upgrade() else {
                    return;
                };
                if tx.send(Command::Inbound { generation, event }).is_err() || closed {
                    break;
                }
            }
            if !closed && let Some(tx) = mailbox.upgrade() {
                let _ = tx.send(Command::Inbound {
                    generation,
                    event: ChannelEvent::Closed {
                        code: None,
                        reason: String::new(),
                    },
                });
            }
        });
    }

    async fn close_link(&mut self) {
        match std::mem::replace(&mut self.link, Link::Idle) {
            Link::Connected(writer) => writer.close().await,
            Link::Waiting(timer) => timer.cancel(),
            Link::Idle => {}
        }
    }

    fn schedule_reconnect(&mut self) {
        let generation = self.generation;
        let mailbox = self.mailbox.clone();
        let delay = self.config.reconnect_delay();
        debug!(generation, ?delay, "Reconnect scheduled");
        self.link = Link::Waiting(ExpiryTimer::start(delay, async move {
            if let Some(tx) = mailbox.upgrade() {
                let _ = tx.send(Command::Reconnect { generation });
            }
        }));
    }

    fn on_closed(&mut self, code: Option<u16>, reason: String) {
        info!(generation = self.generation, ?code, %reason, "Live channel closed");
        self.link = Link::Idle;
        self.self_typing.clear();
        self.state.signals.clear();

        if code == Some(HANDSHAKE_REJECTED) {
            self.notify(ClientNotice::HandshakeRejected {
                reason: reason.clone(),
            });
        }
        self.notify(ClientNotice::Disconnected { code, reason });

        if self.token.is_some() {
            self.schedule_reconnect();
        }
    }

    async fn logout(&mut self) {
        self.token = None;
        self.generation += 1;
        self.epoch += 1;
        self.close_link().await;
        self.self_typing.clear();
        self.state.clear();
        info!("Logged out");
        self.notify(ClientNotice::LoggedOut);
    }

    // ── Inbound frames ─────────────────────────────────────────────

    fn on_frame(&mut self, raw: &str) {
        let event: ServerEvent = match serde_json::from_str(raw) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Ignoring undecodable server frame");
                return;
            }
        };

        match event {
            ServerEvent::Ready {
                user,
                conversations,
                server_instance_id,
            } => {
                let user_id = user.id;
                self.self_typing.clear();
                if self.state.apply_ready(user, conversations, server_instance_id) {
                    info!(%server_instance_id, "Server restarted; caches discarded");
                    self.epoch += 1;
                    self.notify(ClientNotice::ServerRestarted);
                }
                self.notify(ClientNotice::Ready {
                    user_id,
                    server_instance_id,
                });
            }
            ServerEvent::ConversationList { conversations } => {
                self.state.conversations = conversations;
            }
            ServerEvent::ConversationUpdated { conversation, .. } => {
                self.state.upsert_conversation(conversation);
            }
            ServerEvent::MessageCreated { message, .. } => self.state.record_message(message),
            ServerEvent::MessageAck { message, client_id } => match client_id {
                Some(temp_id) => {
                    self.state.touch_conversation(&message);
                    self.state.messages.confirm(&temp_id, message);
                }
                None => self.state.record_message(message),
            },
            ServerEvent::ApprovalUpdated { request } => self.state.upsert_approval(request),
            ServerEvent::PresenceUpdated { user } => self.state.apply_presence(user),
            ServerEvent::Typing {
                conversation_id,
                user_id,
                display_name,
                typing,
            } => self.mirror_signal(
                SignalKey {
                    conversation_id,
                    user_id,
                    kind: IndicatorKind::Typing,
                },
                &display_name,
                typing,
            ),
            ServerEvent::Thinking {
                conversation_id,
                user_id,
                display_name,
                thinking,
            } => self.mirror_signal(
                SignalKey {
                    conversation_id,
                    user_id,
                    kind: IndicatorKind::Thinking,
                },
                &display_name,
                thinking,
            ),
            ServerEvent::ReadReceipt {
                conversation_id,
                user_id,
                message_id,
                read_at,
            } => self.state.record_receipt(ReadReceipt {
                conversation_id,
                user_id,
                message_id,
                read_at,
            }),
            ServerEvent::Error { error } => {
                debug!(%error, "Server reported an error");
                self.notify(ClientNotice::ServerError(error));
            }
            ServerEvent::Pong { ts } => trace!(ts, "pong"),
        }
    }

    fn is_self(&self, user_id: UserId) -> bool {
        self.state.user.as_ref().is_some_and(|me| me.id == user_id)
    }

    fn mirror_signal(&mut self, key: SignalKey, display_name: &str, active: bool) {
        if self.is_self(key.user_id) {
            return;
        }
        if !active {
            self.state.signals.stop(key);
            return;
        }

        let ttl = match key.kind {
            IndicatorKind::Typing => self.config.typing_ttl(),
            IndicatorKind::Thinking => self.config.thinking_ttl(),
        };
        let mailbox = self.mailbox.clone();
        self.state.signals.start(key, display_name, ttl, move |generation| async move {
            if let Some(tx) = mailbox.upgrade() {
                let _ = tx.send(Command::SignalExpired { key, generation });
            }
        });
    }

    // ── Outbound ───────────────────────────────────────────────────

    fn send_event(&self, event: &ClientEvent) -> bool {
        let Link::Connected(writer) = &self.link else {
            return false;
        };
        match serde_json::to_string(event) {
            Ok(frame) => writer.send(frame),
            Err(e) => {
                warn!(error = %e, "Failed to encode client event");
                false
            }
        }
    }

    fn notify_typing(&mut self, conversation_id: ConversationId) {
        if !matches!(self.link, Link::Connected(_)) {
            return;
        }
        let mailbox = self.mailbox.clone();
        let frames = self.self_typing.notify(
            conversation_id,
            self.config.self_typing_ttl(),
            move |generation| async move {
                if let Some(tx) = mailbox.upgrade() {
                    let _ = tx.send(Command::TypingIdle { generation });
                }
            },
        );
        for (conversation_id, typing) in frames {
            self.send_event(&ClientEvent::Typing {
                conversation_id,
                typing,
            });
        }
    }

    fn send_message(
        &mut self,
        conversation_id: ConversationId,
        content: String,
        format: MessageFormat,
    ) -> AppResult<String> {
        if content.trim().is_empty() {
            return Err(AppError::validation("Message content is required"));
        }
        let (Some(token), Some(author)) = (self.token.clone(), self.state.user.clone()) else {
            return Err(AppError::authentication("Not signed in"));
        };

        let temp_id = self
            .state
            .messages
            .insert_provisional(conversation_id, &author, content.clone(), format);
        if let Some(typing_in) = self.self_typing.reset() {
            self.send_event(&ClientEvent::Typing {
                conversation_id: typing_in,
                typing: false,
            });
        }

        let submitter = self.submitter.clone();
        let mailbox = self.mailbox.clone();
        let epoch = self.epoch;
        let reply_id = temp_id.clone();
        tokio::spawn(async move {
            let result = submitter
                .submit(&token, conversation_id, &content, format)
                .await;
            if let Some(tx) = mailbox.upgrade() {
                let _ = tx.send(Command::Submitted {
                    epoch,
                    conversation_id,
                    temp_id: reply_id,
                    result,
                });
            }
        });
        debug!(%conversation_id, %temp_id, "Message submitted optimistically");
        Ok(temp_id)
    }

    fn on_submitted(
        &mut self,
        conversation_id: ConversationId,
        temp_id: String,
        result: Result<Message, TransportError>,
    ) {
        match result {
            Ok(message) => {
                let message_id = message.id;
                self.state.touch_conversation(&message);
                self.state.messages.confirm(&temp_id, message);
                self.notify(ClientNotice::MessageConfirmed {
                    temp_id,
                    message_id,
                });
            }
            Err(e) => {
                let error = e.user_message();
                warn!(%conversation_id, %temp_id, %error, "Message submission failed");
                self.state
                    .messages
                    .fail(conversation_id, &temp_id, error.clone());
                self.notify(ClientNotice::MessageFailed { temp_id, error });
            }
        }
    }
}
