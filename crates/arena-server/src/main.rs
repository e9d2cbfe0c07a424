//! Othello Arena Server
//!
//! An Axum-based server that hosts Othello matches between humans and
//! user-uploaded bots:
//! - WebSocket endpoint for match creation, moves, pause, and live state
//! - REST endpoints for bot upload (with static vetting) and listing
//! - In-memory match registry; vetted bots run as sandboxed subprocesses

mod api;
mod config;
mod coordinator;
mod protocol;
mod registry;
mod ws;

use anyhow::Context;
use axum::routing::{delete, get, post};
use axum::Router;
use bot_sandbox::BotCatalog;
use config::ServerConfig;
use registry::MatchRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live matches.
    pub registry: Arc<MatchRegistry>,
    /// Vetted bot descriptors.
    pub catalog: Arc<BotCatalog>,
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::load().context("Failed to load configuration")?;
    let catalog = Arc::new(
        BotCatalog::open(
            &config.builtin_bots_dir,
            &config.uploaded_bots_dir,
            &config.quarantine_dir,
        )
        .context("Failed to open bot catalog")?,
    );
    let registry = Arc::new(MatchRegistry::new(catalog.clone(), config.clone()));
    let state = AppState { registry, catalog };

    // CORS layer for the browser frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/bots", get(api::bots::list_bots))
        .route("/api/bots/upload", post(api::bots::upload_bot))
        .route("/api/bots/:name", delete(api::bots::delete_bot))
        .route("/api/security/log", get(api::bots::security_log))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .layer(cors);

    let addr: SocketAddr = config
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.bind))?;
    tracing::info!("Server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;
    Ok(())
}
