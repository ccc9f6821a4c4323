//! Application state shared across all handlers.

use std::sync::Arc;

use parlor_auth::JwtDecoder;
use parlor_core::config::AppConfig;
use parlor_realtime::RealtimeEngine;
use parlor_store::ChatStore;

/// Shared application state. Every field is reference-counted so cloning
/// per request is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Merged application configuration.
    pub config: Arc<AppConfig>,
    /// Live-channel engine.
    pub engine: Arc<RealtimeEngine>,
    /// Bearer-token verification.
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Durable collaborators.
    pub store: Arc<dyn ChatStore>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine)
            .finish()
    }
}

impl AppState {
    /// Builds the state and the engine it owns.
    pub fn new(config: AppConfig, store: Arc<dyn ChatStore>) -> Self {
        let jwt_decoder = Arc::new(JwtDecoder::new(&config.auth));
        let engine = Arc::new(RealtimeEngine::new(
            config.realtime.clone(),
            store.clone(),
            jwt_decoder.clone(),
        ));
        Self {
            config: Arc::new(config),
            engine,
            jwt_decoder,
            store,
        }
    }
}
