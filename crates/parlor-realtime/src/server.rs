//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use parlor_auth::JwtDecoder;
use parlor_core::config::RealtimeConfig;
use parlor_store::ChatStore;

use crate::connection::authenticator::WsAuthenticator;
use crate::connection::manager::ConnectionManager;
use crate::connection::registry::ConnectionRegistry;
use crate::dispatch::dispatcher::EventDispatcher;
use crate::ephemeral::tracker::EphemeralTracker;
use crate::presence::tracker::PresenceTracker;
use crate::service::ChatService;

/// Central real-time engine. Created once at startup, shared by every
/// connection task and HTTP handler, and shut down with the process.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection lifecycle.
    pub connections: Arc<ConnectionManager>,
    /// Live connections by user.
    pub registry: Arc<ConnectionRegistry>,
    /// Event fan-out.
    pub dispatcher: Arc<EventDispatcher>,
    /// Presence state.
    pub presence: Arc<PresenceTracker>,
    /// Typing/thinking signals.
    pub signals: Arc<EphemeralTracker>,
    /// Message, signal, and receipt actions.
    pub chat: Arc<ChatService>,
    server_instance_id: Uuid,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("server_instance_id", &self.server_instance_id)
            .finish()
    }
}

impl RealtimeEngine {
    /// Creates a new real-time engine with all subsystems.
    pub fn new(config: RealtimeConfig, store: Arc<dyn ChatStore>, decoder: Arc<JwtDecoder>) -> Self {
        let server_instance_id = Uuid::new_v4();

        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = Arc::new(EventDispatcher::new(registry.clone(), store.clone()));
        let presence = Arc::new(PresenceTracker::new(
            registry.clone(),
            store.clone(),
            dispatcher.clone(),
        ));
        let signals = EphemeralTracker::new(&config, dispatcher.clone());
        let chat = Arc::new(ChatService::new(
            store.clone(),
            dispatcher.clone(),
            signals.clone(),
            config.clone(),
        ));
        let connections = Arc::new(ConnectionManager::new(
            WsAuthenticator::new(decoder, store.clone()),
            registry.clone(),
            presence.clone(),
            signals.clone(),
            chat.clone(),
            store,
            config,
            server_instance_id,
        ));

        info!(server_instance_id = %server_instance_id, "Real-time engine initialized");

        Self {
            connections,
            registry,
            dispatcher,
            presence,
            signals,
            chat,
            server_instance_id,
            shutdown: CancellationToken::new(),
        }
    }

    /// Identifier fixed for the lifetime of this process.
    pub fn server_instance_id(&self) -> Uuid {
        self.server_instance_id
    }

    /// Token cancelled when the engine shuts down. Connection tasks select
    /// on it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stops every connection task and empties the registry.
    ///
    /// Each connection goes through the regular disconnect path, so users
    /// whose last connection closes here are recorded offline.
    pub async fn shutdown(&self) {
        info!("Shutting down real-time engine");

        self.shutdown.cancel();
        let open = self.registry.all_connections();
        for handle in &open {
            self.connections.disconnect(handle).await;
        }
        self.signals.clear_all();

        info!(count = open.len(), "Real-time engine shut down");
    }
}
