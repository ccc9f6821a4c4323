//! Shared test helpers for integration tests.
//!
//! Everything runs in process: raw sessions are admitted straight into the
//! engine, and [`ChatClient`]s reach it through [`EngineConnector`] (live
//! channel) and [`RouterSubmitter`] (HTTP trigger via the real router).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use parlor_api::{AppState, build_app};
use parlor_auth::JwtEncoder;
use parlor_client::{
    Channel, ChannelEvent, ChatClient, ClientNotice, Connector, MessageSubmitter, TransportError,
};
use parlor_core::config::AppConfig;
use parlor_core::types::ConversationId;
use parlor_entity::{Conversation, ConversationKind, MemberCapabilities, Message, MessageFormat, UserProfile};
use parlor_realtime::RealtimeEngine;
use parlor_realtime::connection::handle::ConnectionHandle;
use parlor_store::MemoryStore;

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Shared state behind the router
    pub state: AppState,
    /// In-memory store for seeding and direct reads
    pub store: Arc<MemoryStore>,
    encoder: JwtEncoder,
    connector: Arc<EngineConnector>,
}

impl TestApp {
    /// Create a new test application
    pub fn new() -> Self {
        let config = AppConfig::default();
        let encoder = JwtEncoder::new(&config.auth);
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(config, store.clone());
        let connector = Arc::new(EngineConnector::new(state.engine.clone()));

        Self {
            router: build_app(state.clone()),
            state,
            store,
            encoder,
            connector,
        }
    }

    pub fn engine(&self) -> &RealtimeEngine {
        &self.state.engine
    }

    /// Create a test user and return it with a bearer token
    pub async fn create_user(&self, username: &str, display_name: &str) -> (UserProfile, String) {
        let user = self.store.create_user(username, display_name).await;
        let token = self
            .encoder
            .issue(user.id, &user.username)
            .expect("Failed to issue token");
        (user, token)
    }

    /// Create a room whose members all have standard capabilities
    pub async fn create_room(&self, members: &[&UserProfile]) -> Conversation {
        let members: Vec<_> = members
            .iter()
            .map(|u| (u.id, MemberCapabilities::standard()))
            .collect();
        self.store
            .create_conversation(ConversationKind::Room, Some("room"), &members)
            .await
    }

    /// Admit a live connection directly into the engine
    pub async fn open_session(&self, token: &str) -> RawSession {
        let session = self
            .engine()
            .connections
            .admit(Some(token))
            .await
            .expect("Handshake rejected");
        RawSession {
            handle: session.handle,
            outbound: session.outbound,
            engine: self.state.engine.clone(),
        }
    }

    /// Start a client wired to this app
    pub fn start_client(&self) -> (ChatClient, mpsc::UnboundedReceiver<ClientNotice>) {
        let submitter = Arc::new(RouterSubmitter {
            router: self.router.clone(),
        });
        ChatClient::start(
            self.state.config.client.clone(),
            self.connector.clone(),
            submitter,
        )
    }

    /// Simulates every client channel dropping without a close handshake
    pub fn sever_client_channels(&self) {
        self.connector.sever_all();
    }

    /// Make an HTTP request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

/// A connection admitted without any transport in between.
pub struct RawSession {
    pub handle: Arc<ConnectionHandle>,
    outbound: mpsc::Receiver<String>,
    engine: Arc<RealtimeEngine>,
}

impl RawSession {
    /// Feed one client event to the engine as if it arrived on the socket
    pub async fn send(&self, event: Value) {
        self.engine
            .connections
            .handle_inbound(&self.handle, &event.to_string())
            .await;
    }

    /// Every frame queued for this connection so far
    pub fn drain(&mut self) -> Vec<Value> {
        std::iter::from_fn(|| self.outbound.try_recv().ok())
            .map(|f| serde_json::from_str(&f).expect("Server sent invalid JSON"))
            .collect()
    }

    /// Queued frames of one event type
    pub fn drain_type(&mut self, ty: &str) -> Vec<Value> {
        self.drain()
            .into_iter()
            .filter(|e| e["type"] == ty)
            .collect()
    }

    pub async fn close(self) {
        self.engine.connections.disconnect(&self.handle).await;
    }
}

/// Opens client channels straight into the engine, running the same
/// admit / route / disconnect sequence as the WebSocket handler.
pub struct EngineConnector {
    engine: Arc<RealtimeEngine>,
    severed: Mutex<Vec<CancellationToken>>,
}

impl EngineConnector {
    fn new(engine: Arc<RealtimeEngine>) -> Self {
        Self {
            engine,
            severed: Mutex::new(Vec::new()),
        }
    }

    fn sever_all(&self) {
        for token in self.severed.lock().unwrap().drain(..) {
            token.cancel();
        }
    }
}

#[async_trait]
impl Connector for EngineConnector {
    async fn connect(&self, token: &str) -> Result<Channel, TransportError> {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let session = match self.engine.connections.admit(Some(token)).await {
            Ok(session) => session,
            Err(e) => {
                let _ = in_tx.send(ChannelEvent::Closed {
                    code: Some(e.code),
                    reason: e.reason,
                });
                return Ok(Channel::new(out_tx, in_rx, shutdown, None));
            }
        };

        let severed = CancellationToken::new();
        self.severed.lock().unwrap().push(severed.clone());

        let engine = self.engine.clone();
        let closing = shutdown.clone();
        let handle = session.handle;
        let mut outbound = session.outbound;
        let pump = tokio::spawn(async move {
            let end = loop {
                tokio::select! {
                    _ = closing.cancelled() => break (Some(1000), String::new()),
                    _ = severed.cancelled() => break (Some(1006), String::new()),
                    frame = outbound.recv() => match frame {
                        Some(frame) => {
                            let _ = in_tx.send(ChannelEvent::Frame(frame));
                        }
                        None => break (Some(1001), "Server shutting down".to_string()),
                    },
                    frame = out_rx.recv() => match frame {
                        Some(raw) => engine.connections.handle_inbound(&handle, &raw).await,
                        None => break (Some(1000), String::new()),
                    },
                }
            };
            engine.connections.disconnect(&handle).await;
            let _ = in_tx.send(ChannelEvent::Closed {
                code: end.0,
                reason: end.1,
            });
        });

        Ok(Channel::new(out_tx, in_rx, shutdown, Some(pump)))
    }
}

/// Submits through `POST /api/conversations/{id}/messages` on the router.
pub struct RouterSubmitter {
    router: Router,
}

#[async_trait]
impl MessageSubmitter for RouterSubmitter {
    async fn submit(
        &self,
        token: &str,
        conversation_id: ConversationId,
        content: &str,
        format: MessageFormat,
    ) -> Result<Message, TransportError> {
        let body = serde_json::json!({ "content": content, "format": format });
        let req = Request::builder()
            .method("POST")
            .uri(format!("/api/conversations/{conversation_id}/messages"))
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::from(body.to_string()))
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        if status.is_success() {
            return serde_json::from_value(body["message"].clone())
                .map_err(|e| TransportError::Request(e.to_string()));
        }
        Err(TransportError::Rejected {
            status: status.as_u16(),
            message: body["message"].as_str().unwrap_or_default().to_string(),
        })
    }
}

/// Lets every runnable task finish; under paused time the clock only
/// moves once the runtime is idle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

/// Waits for the first notice matching `pred`, skipping others
pub async fn wait_for_notice(
    notices: &mut mpsc::UnboundedReceiver<ClientNotice>,
    pred: impl Fn(&ClientNotice) -> bool,
) -> ClientNotice {
    tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            let notice = notices.recv().await.expect("Client stopped");
            if pred(&notice) {
                return notice;
            }
        }
    })
    .await
    .expect("Timed out waiting for client notice")
}
