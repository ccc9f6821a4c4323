//! Parlor Server: real-time chat event distribution
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use parlor_api::{AppState, build_app};
use parlor_auth::JwtEncoder;
use parlor_core::config::AppConfig;
use parlor_core::error::AppError;
use parlor_entity::{ConversationKind, MemberCapabilities};
use parlor_store::MemoryStore;

#[tokio::main]
async fn main() {
    let env = std::env::var("PARLOR_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!("Loaded configuration (env: {})", env);

    if let Err(e) = run(config, &env).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig, env: &str) -> Result<(), AppError> {
    tracing::info!("Starting Parlor v{}", env!("CARGO_PKG_VERSION"));

    if config.auth.uses_default_secret() {
        tracing::warn!("Using the built-in JWT secret; set PARLOR__AUTH__JWT_SECRET outside development");
    }

    // ── Step 1: Store ─────────────────────────────────────────────
    let store = Arc::new(MemoryStore::new());
    if env == "development" {
        seed_development(&store, &config).await?;
    }

    // ── Step 2: Engine + router ──────────────────────────────────
    let state = AppState::new(config.clone(), store);
    let engine = Arc::clone(&state.engine);
    let app = build_app(state);

    // ── Step 3: Bind ─────────────────────────────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Parlor server listening on {}", addr);

    // ── Step 4: Serve until a shutdown signal ───────────────────
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(AppError::internal(format!("Server error: {}", e))),
                Err(e) => Err(AppError::internal(format!("Server task failed: {}", e))),
            };
        }
        _ = shutdown_signal() => {}
    }

    // ── Step 5: Graceful shutdown ────────────────────────────────
    tracing::info!("Shutdown signal received, closing live connections...");
    let _ = shutdown_tx.send(true);
    engine.shutdown().await;

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    match tokio::time::timeout(grace, server).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => return Err(AppError::internal(format!("Server error: {}", e))),
        Ok(Err(e)) => return Err(AppError::internal(format!("Server task failed: {}", e))),
        Err(_) => tracing::warn!("Connections still open after {:?}; exiting", grace),
    }

    tracing::info!("Parlor server shut down gracefully");
    Ok(())
}

/// Creates two users sharing one room and logs a token for each, so a
/// fresh development server can be exercised right away.
async fn seed_development(store: &MemoryStore, config: &AppConfig) -> Result<(), AppError> {
    let encoder = JwtEncoder::new(&config.auth);
    let ada = store.create_user("ada", "Ada").await;
    let bob = store.create_user("bob", "Bob").await;
    let room = store
        .create_conversation(
            ConversationKind::Room,
            Some("general"),
            &[
                (ada.id, MemberCapabilities::standard()),
                (bob.id, MemberCapabilities::standard()),
            ],
        )
        .await;

    for user in [&ada, &bob] {
        let token = encoder.issue(user.id, &user.username)?;
        tracing::info!(user_id = %user.id, username = %user.username, %token, "Seeded development user");
    }
    tracing::info!(conversation_id = %room.id, "Seeded development conversation");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
