//! Public handle to a running client.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use parlor_core::config::ClientConfig;
use parlor_core::types::{ConversationId, MessageId, UserId};
use parlor_core::{AppError, AppResult};
use parlor_entity::MessageFormat;

use crate::cache::state::ClientState;
use crate::supervisor::{Command, Supervisor};
use crate::transport::Connector;
use crate::transport::http::MessageSubmitter;

/// Where the live channel currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    /// Not signed in, or signed out.
    Offline,
    /// A channel is open.
    Connected,
    /// The channel dropped; a single reconnect is pending.
    Reconnecting,
}

/// Things worth telling the embedding application about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientNotice {
    /// A `ready` snapshot was applied.
    Ready {
        user_id: UserId,
        server_instance_id: Uuid,
    },
    /// The snapshot came from a new server process; all caches were reset.
    ServerRestarted,
    /// The channel ended or could not be opened.
    Disconnected { code: Option<u16>, reason: String },
    /// The server refused the handshake.
    HandshakeRejected { reason: String },
    MessageConfirmed { temp_id: String, message_id: MessageId },
    MessageFailed { temp_id: String, error: String },
    /// An `error` event from the server.
    ServerError(String),
    LoggedOut,
}

/// Cheap, cloneable handle to the client supervisor.
///
/// The supervisor stops once the last handle is dropped.
#[derive(Clone)]
pub struct ChatClient {
    commands: mpsc::UnboundedSender<Command>,
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("running", &!self.commands.is_closed())
            .finish()
    }
}

impl ChatClient {
    /// Spawns the supervisor and returns its handle along with the notice
    /// stream. Must be called from within a tokio runtime.
    pub fn start(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        submitter: Arc<dyn MessageSubmitter>,
    ) -> (Self, mpsc::UnboundedReceiver<ClientNotice>) {
        let (commands, inbox) = mpsc::unbounded_channel();
        let (notices, notice_rx) = mpsc::unbounded_channel();
        let supervisor = Supervisor::new(
            config,
            connector,
            submitter,
            inbox,
            commands.downgrade(),
            notices,
        );
        tokio::spawn(supervisor.run());
        (Self { commands }, notice_rx)
    }

    /// Stores the token and opens the live channel, replacing any open one.
    pub fn login(&self, token: impl Into<String>) {
        self.dispatch(Command::Login(token.into()));
    }

    /// Closes the channel, cancels any pending reconnect and forgets all
    /// cached state.
    pub fn logout(&self) {
        self.dispatch(Command::Logout);
    }

    /// Shows the message immediately as `sending` and submits it in the
    /// background. Returns the temporary id of the provisional entry.
    pub async fn send_message(
        &self,
        conversation_id: ConversationId,
        content: impl Into<String>,
        format: MessageFormat,
    ) -> AppResult<String> {
        let (reply, rx) = oneshot::channel();
        self.dispatch(Command::Send {
            conversation_id,
            content: content.into(),
            format,
            reply,
        });
        rx.await.map_err(|_| stopped())?
    }

    /// Call on every keystroke in `conversation_id`'s composer.
    pub fn notify_typing(&self, conversation_id: ConversationId) {
        self.dispatch(Command::NotifyTyping(conversation_id));
    }

    /// Ends the user's typing signal now, e.g. when the composer loses focus.
    pub fn reset_typing(&self) {
        self.dispatch(Command::ResetTyping);
    }

    /// Asks the server for a fresh conversation list.
    pub fn refresh_conversations(&self) {
        self.dispatch(Command::RefreshConversations);
    }

    pub fn ping(&self) {
        self.dispatch(Command::Ping);
    }

    /// Runs `f` against the current state on the supervisor task.
    pub async fn inspect<R, F>(&self, f: F) -> AppResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&ClientState) -> R + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.dispatch(Command::Inspect(Box::new(move |state, _| {
            let _ = tx.send(f(state));
        })));
        rx.await.map_err(|_| stopped())
    }

    pub async fn link_state(&self) -> AppResult<LinkState> {
        let (tx, rx) = oneshot::channel();
        self.dispatch(Command::Inspect(Box::new(move |_, link| {
            let _ = tx.send(link);
        })));
        rx.await.map_err(|_| stopped())
    }

    fn dispatch(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!("Client supervisor is gone; command dropped");
        }
    }
}

fn stopped() -> AppError {
    AppError::service_unavailable("Client has stopped")
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use tokio::sync::Notify;

    use parlor_entity::{Message, UserProfile};

    use super::*;
    use crate::cache::messages::DeliveryStatus;
    use crate::signals::mirror::IndicatorKind;
    use crate::transport::TransportError;
    use crate::transport::testing::{ScriptedConnector, ServerEnd};

    /// Answers every submit with the scripted result once released.
    #[derive(Default)]
    struct HeldSubmitter {
        release: Notify,
        reject: Mutex<Option<TransportError>>,
        author: Mutex<Option<UserId>>,
    }

    #[async_trait]
    impl MessageSubmitter for HeldSubmitter {
        async fn submit(
            &self,
            _token: &str,
            conversation_id: ConversationId,
            content: &str,
            format: MessageFormat,
        ) -> Result<Message, TransportError> {
            self.release.notified().await;
            if let Some(err) = self.reject.lock().unwrap().take() {
                return Err(err);
            }
            Ok(Message {
                id: MessageId::new(),
                conversation_id,
                user_id: self.author.lock().unwrap().unwrap_or_default(),
                display_name: None,
                avatar_url: None,
                content: content.to_string(),
                format,
                created_at: Utc::now(),
            })
        }
    }

    struct Harness {
        client: ChatClient,
        notices: mpsc::UnboundedReceiver<ClientNotice>,
        connector: Arc<ScriptedConnector>,
        submitter: Arc<HeldSubmitter>,
        me: UserId,
        instance: Uuid,
    }

    impl Harness {
        fn start() -> Self {
            let connector = Arc::new(ScriptedConnector::default());
            let submitter = Arc::new(HeldSubmitter::default());
            let me = UserId::new();
            *submitter.author.lock().unwrap() = Some(me);
            let (client, notices) =
                ChatClient::start(ClientConfig::default(), connector.clone(), submitter.clone());
            Self {
                client,
                notices,
                connector,
                submitter,
                me,
                instance: Uuid::new_v4(),
            }
        }

        fn ready_frame(&self, conversations: serde_json::Value) -> serde_json::Value {
            json!({
                "type": "ready",
                "user": UserProfile::new(self.me, "me"),
                "conversations": conversations,
                "serverInstanceId": self.instance,
            })
        }

        /// Logs in and applies a `ready` snapshot; returns the server end.
        async fn connect(&mut self) -> ServerEnd {
            self.client.login("token-1");
            settle().await;
            let end = self.connector.take_ends().pop().unwrap();
            end.push(self.ready_frame(json!([])));
            settle().await;
            self.drain();
            end
        }

        fn drain(&mut self) -> Vec<ClientNotice> {
            std::iter::from_fn(|| self.notices.try_recv().ok()).collect()
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn typing_frame(conversation_id: ConversationId, user_id: UserId, typing: bool) -> serde_json::Value {
        json!({
            "type": "typing",
            "conversationId": conversation_id,
            "userId": user_id,
            "displayName": "Bob",
            "typing": typing,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_once_after_drop() {
        let mut h = Harness::start();
        let end = h.connect().await;
        assert_eq!(end.token, "token-1");

        end.drop_connection();
        settle().await;
        assert_eq!(h.client.link_state().await.unwrap(), LinkState::Reconnecting);
        assert!(matches!(
            h.drain().as_slice(),
            [ClientNotice::Disconnected { code: Some(1006), .. }]
        ));

        tokio::time::advance(Duration::from_millis(1_400)).await;
        settle().await;
        assert_eq!(h.connector.opened(), 0);

        tokio::time::advance(Duration::from_millis(200)).await;
        settle().await;
        assert_eq!(h.connector.opened(), 1);
        assert_eq!(h.client.link_state().await.unwrap(), LinkState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_cancels_pending_reconnect() {
        let mut h = Harness::start();
        let end = h.connect().await;
        end.drop_connection();
        settle().await;

        h.client.logout();
        settle().await;
        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;

        assert_eq!(h.connector.opened(), 0);
        assert_eq!(h.client.link_state().await.unwrap(), LinkState::Offline);
        assert!(h.drain().contains(&ClientNotice::LoggedOut));
        assert!(h.client.inspect(|s| s.user().is_none()).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_relogin_closes_previous_channel_first() {
        let mut h = Harness::start();
        let first = h.connect().await;

        h.client.login("token-2");
        settle().await;
        assert!(first.closed.is_cancelled());

        let second = h.connector.take_ends().pop().unwrap();
        assert_eq!(second.token, "token-2");

        // Late frames from the replaced channel are ignored.
        first.push(typing_frame(ConversationId::new(), UserId::new(), true));
        settle().await;
        assert_eq!(h.client.inspect(|s| s.active_signals()).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_failure_retries_after_delay() {
        let mut h = Harness::start();
        h.connector.fail_next(TransportError::Connect("refused".into()));
        h.client.login("token-1");
        settle().await;
        assert_eq!(h.connector.opened(), 0);
        assert!(matches!(
            h.drain().as_slice(),
            [ClientNotice::Disconnected { code: None, .. }]
        ));

        tokio::time::advance(Duration::from_millis(1_500)).await;
        settle().await;
        assert_eq!(h.connector.opened(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_rejection_is_reported() {
        let mut h = Harness::start();
        h.client.login("stale");
        settle().await;
        let end = h.connector.take_ends().pop().unwrap();
        let _ = end.to_client.send(crate::transport::ChannelEvent::Closed {
            code: Some(4001),
            reason: "Invalid token".into(),
        });
        settle().await;

        let notices = h.drain();
        assert!(notices.contains(&ClientNotice::HandshakeRejected {
            reason: "Invalid token".into()
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_signals_mirror_expire_and_skip_self() {
        let mut h = Harness::start();
        let end = h.connect().await;
        let conv = ConversationId::new();

        end.push(typing_frame(conv, h.me, true));
        end.push(typing_frame(conv, UserId::new(), true));
        settle().await;
        assert_eq!(
            h.client
                .inspect(move |s| s.indicator(conv, IndicatorKind::Typing))
                .await
                .unwrap()
                .as_deref(),
            Some("Bob is typing…")
        );

        tokio::time::advance(Duration::from_millis(4_100)).await;
        settle().await;
        assert_eq!(h.client.inspect(|s| s.active_signals()).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_and_ready_clear_signals() {
        let mut h = Harness::start();
        let end = h.connect().await;
        let conv = ConversationId::new();
        let bob = UserId::new();

        end.push(typing_frame(conv, bob, true));
        settle().await;
        end.push(h.ready_frame(json!([])));
        settle().await;
        assert_eq!(h.client.inspect(|s| s.active_signals()).await.unwrap(), 0);

        end.push(typing_frame(conv, bob, true));
        settle().await;
        end.drop_connection();
        settle().await;
        assert_eq!(h.client.inspect(|s| s.active_signals()).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_server_instance_is_reported() {
        let mut h = Harness::start();
        let end = h.connect().await;
        let conv = ConversationId::new();
        end.push(json!({
            "type": "message:created",
            "conversationId": conv,
            "message": {
                "id": MessageId::new(),
                "conversationId": conv,
                "userId": UserId::new(),
                "content": "hi",
                "createdAt": Utc::now(),
            },
        }));
        settle().await;
        assert_eq!(h.client.inspect(move |s| s.messages(conv).len()).await.unwrap(), 1);

        h.instance = Uuid::new_v4();
        end.push(h.ready_frame(json!([])));
        settle().await;
        assert!(h.drain().contains(&ClientNotice::ServerRestarted));
        assert_eq!(h.client.inspect(move |s| s.messages(conv).len()).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_optimistic_send_without_duplicate() {
        let mut h = Harness::start();
        let mut end = h.connect().await;
        let conv = ConversationId::new();

        h.client.notify_typing(conv);
        settle().await;
        let temp = h
            .client
            .send_message(conv, "hello", MessageFormat::Text)
            .await
            .unwrap();

        let sent = end.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1]["typing"], json!(false));

        let status = h
            .client
            .inspect(move |s| s.messages(conv)[0].status)
            .await
            .unwrap();
        assert_eq!(status, DeliveryStatus::Sending);

        h.submitter.release.notify_one();
        settle().await;
        let confirmed = h.drain();
        let Some(ClientNotice::MessageConfirmed { temp_id, message_id }) = confirmed.first() else {
            panic!("expected confirmation, got {confirmed:?}");
        };
        assert_eq!(temp_id, &temp);

        // The fan-out copy of the same record arrives afterwards.
        end.push(json!({
            "type": "message:created",
            "conversationId": conv,
            "message": {
                "id": message_id,
                "conversationId": conv,
                "userId": h.me,
                "content": "hello",
                "createdAt": Utc::now(),
            },
        }));
        settle().await;
        let list = h.client.inspect(move |s| s.messages(conv).to_vec()).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].canonical_id(), Some(*message_id));
        assert_eq!(list[0].status, DeliveryStatus::Delivered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_send_is_marked_failed() {
        let mut h = Harness::start();
        let _end = h.connect().await;
        let conv = ConversationId::new();
        *h.submitter.reject.lock().unwrap() = Some(TransportError::Rejected {
            status: 404,
            message: "Conversation not found".into(),
        });

        let temp = h
            .client
            .send_message(conv, "hello", MessageFormat::Text)
            .await
            .unwrap();
        h.submitter.release.notify_one();
        settle().await;

        assert_eq!(
            h.drain(),
            vec![ClientNotice::MessageFailed {
                temp_id: temp,
                error: "Conversation not found".into()
            }]
        );
        let entry = h
            .client
            .inspect(move |s| s.messages(conv)[0].clone())
            .await
            .unwrap();
        assert_eq!(entry.status, DeliveryStatus::Failed);
        assert_eq!(entry.error.as_deref(), Some("Conversation not found"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_requires_session_and_content() {
        let mut h = Harness::start();
        let conv = ConversationId::new();
        let err = h
            .client
            .send_message(conv, "hello", MessageFormat::Text)
            .await
            .unwrap_err();
        assert!(err.is_authentication());

        let _end = h.connect().await;
        let err = h
            .client
            .send_message(conv, "   ", MessageFormat::Text)
            .await
            .unwrap_err();
        assert_eq!(err.kind, parlor_core::error::ErrorKind::Validation);
    }

    #[tokio::test(start_paused = true)]
    async fn test_self_typing_goes_idle() {
        let mut h = Harness::start();
        let mut end = h.connect().await;
        let conv = ConversationId::new();

        for _ in 0..3 {
            h.client.notify_typing(conv);
            tokio::time::advance(Duration::from_secs(1)).await;
            settle().await;
        }
        assert_eq!(end.sent().len(), 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;
        let sent = end.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["type"], json!("typing"));
        assert_eq!(sent[0]["typing"], json!(false));
    }
}
