//! Connection manager: handshake admission, inbound routing, and teardown.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use parlor_core::config::RealtimeConfig;
use parlor_core::error::{AppError, ErrorKind};
use parlor_core::types::ConversationId;
use parlor_entity::{ClientEvent, ServerEvent};
use parlor_store::ChatStore;

use crate::ephemeral::signal::SignalKind;
use crate::ephemeral::tracker::EphemeralTracker;
use crate::message::codec::decode_client_event;
use crate::message::validator::validate_frame;
use crate::presence::tracker::PresenceTracker;
use crate::service::ChatService;

use super::authenticator::{HandshakeError, WsAuthenticator};
use super::handle::ConnectionHandle;
use super::registry::ConnectionRegistry;

/// An admitted connection: its registry handle and the receiving end of
/// its outbound queue. The transport drains `outbound` into the socket.
#[derive(Debug)]
pub struct Session {
    pub handle: Arc<ConnectionHandle>,
    pub outbound: mpsc::Receiver<String>,
}

/// Manages the lifecycle of every live connection.
pub struct ConnectionManager {
    authenticator: WsAuthenticator,
    registry: Arc<ConnectionRegistry>,
    presence: Arc<PresenceTracker>,
    signals: Arc<EphemeralTracker>,
    service: Arc<ChatService>,
    store: Arc<dyn ChatStore>,
    config: RealtimeConfig,
    server_instance_id: Uuid,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("server_instance_id", &self.server_instance_id)
            .finish()
    }
}

impl ConnectionManager {
    /// Creates a new connection manager.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        authenticator: WsAuthenticator,
        registry: Arc<ConnectionRegistry>,
        presence: Arc<PresenceTracker>,
        signals: Arc<EphemeralTracker>,
        service: Arc<ChatService>,
        store: Arc<dyn ChatStore>,
        config: RealtimeConfig,
        server_instance_id: Uuid,
    ) -> Self {
        Self {
            authenticator,
            registry,
            presence,
            signals,
            service,
            store,
            config,
            server_instance_id,
        }
    }

    /// Runs the session handshake.
    ///
    /// On success the connection is registered, presence is updated if
    /// this is the user's first connection, and the `ready` snapshot is
    /// already queued on the returned session.
    pub async fn admit(&self, token: Option<&str>) -> Result<Session, HandshakeError> {
        let user = self.authenticator.authenticate(token).await?;

        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(user.id, user.label().to_string(), tx));
        let first = self.registry.register(handle.clone());

        let user = if first {
            match self.presence.connection_opened(user.id).await {
                Ok(profile) => profile,
                Err(e) => {
                    warn!(user_id = %user.id, error = %e, "Presence update failed on connect");
                    user
                }
            }
        } else {
            user
        };

        let conversations = match self.store.conversations_for_user(user.id).await {
            Ok(conversations) => conversations,
            Err(e) => {
                error!(user_id = %user.id, error = %e, "Failed to load conversations for snapshot");
                Vec::new()
            }
        };

        info!(
            conn_id = %handle.id,
            user_id = %user.id,
            first,
            conversations = conversations.len(),
            "Live connection admitted"
        );

        handle.send_event(&ServerEvent::Ready {
            user,
            conversations,
            server_instance_id: self.server_instance_id,
        });

        Ok(Session { handle, outbound: rx })
    }

    /// Processes one inbound text frame. Errors are answered on the same
    /// connection and never close it.
    pub async fn handle_inbound(&self, handle: &ConnectionHandle, raw: &str) {
        if let Err(e) = validate_frame(raw, self.config.max_frame_bytes) {
            handle.send_event(&ServerEvent::error(e.message));
            return;
        }

        let event = match decode_client_event(raw) {
            Ok(event) => event,
            Err(e) => {
                debug!(conn_id = %handle.id, error = %e, "Rejected inbound frame");
                handle.send_event(&ServerEvent::error(e.to_string()));
                return;
            }
        };

        match event {
            ClientEvent::Ping => {
                handle.send_event(&ServerEvent::Pong {
                    ts: Utc::now().timestamp_millis(),
                });
            }
            ClientEvent::ConversationList => {
                match self.store.conversations_for_user(handle.user_id).await {
                    Ok(conversations) => {
                        handle.send_event(&ServerEvent::ConversationList { conversations });
                    }
                    Err(e) => {
                        error!(conn_id = %handle.id, error = %e, "Failed to list conversations");
                        handle.send_event(&ServerEvent::error("Unable to load conversations"));
                    }
                }
            }
            ClientEvent::MessageSend {
                conversation_id,
                content,
                format,
                client_id,
            } => {
                let sent = self
                    .service
                    .send_message(
                        handle.user_id,
                        conversation_id,
                        &content,
                        format.unwrap_or_default(),
                    )
                    .await;
                match sent {
                    Ok(message) => {
                        handle.send_event(&ServerEvent::MessageAck { message, client_id });
                    }
                    Err(e) => reply_error(handle, &e, "Unable to send message"),
                }
            }
            ClientEvent::Typing {
                conversation_id,
                typing,
            } => {
                self.signal(handle, conversation_id, SignalKind::Typing, typing)
                    .await;
            }
            ClientEvent::Thinking {
                conversation_id,
                thinking,
            } => {
                self.signal(handle, conversation_id, SignalKind::Thinking, thinking)
                    .await;
            }
        }
    }

    async fn signal(
        &self,
        handle: &ConnectionHandle,
        conversation_id: ConversationId,
        kind: SignalKind,
        active: bool,
    ) {
        let result = self
            .service
            .set_signal(handle.user_id, &handle.display_name, conversation_id, kind, active)
            .await;
        if let Err(e) = result {
            reply_error(handle, &e, "Unable to update signal");
        }
    }

    /// Tears a connection down. When it was the user's last connection the
    /// user goes offline and their ephemeral signals are cleared.
    pub async fn disconnect(&self, handle: &ConnectionHandle) {
        handle.mark_dead();
        let became_empty = self.registry.unregister(handle.user_id, handle.id);

        if became_empty {
            if let Err(e) = self.presence.connection_closed(handle.user_id).await {
                warn!(user_id = %handle.user_id, error = %e, "Presence update failed on disconnect");
            }
            let cleared = self.signals.clear_user(handle.user_id).await;
            if cleared > 0 {
                debug!(user_id = %handle.user_id, cleared, "Cleared signals of departed user");
            }
        }

        info!(
            conn_id = %handle.id,
            user_id = %handle.user_id,
            last = became_empty,
            "Live connection closed"
        );
    }

    /// Returns the total connection count.
    pub fn connection_count(&self) -> usize {
        self.registry.connection_count()
    }

    /// Returns the number of unique connected users.
    pub fn user_count(&self) -> usize {
        self.registry.user_count()
    }
}

/// Client-facing text for a failed action. Store and internal failures are
/// reported with a generic message.
fn reply_error(handle: &ConnectionHandle, err: &AppError, fallback: &str) {
    let text = match err.kind {
        ErrorKind::NotFound | ErrorKind::Validation | ErrorKind::Authorization => err.message.as_str(),
        _ => {
            error!(conn_id = %handle.id, error = %err, "Live-channel action failed");
            fallback
        }
    };
    handle.send_event(&ServerEvent::error(text));
}
