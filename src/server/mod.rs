//! Axum-based HTTP surface for the companion chat service.
//!
//! Follows the hardened-gateway shape: hyper handles HTTP/1.1 parsing and
//! header sanitization, requests are body-limited and time-bounded, and all
//! handlers share one cloneable state.

mod handlers;
mod session;

use handlers::{
    handle_chat, handle_companion_create, handle_companions_list, handle_conversation_messages,
    handle_conversations_list, handle_health, handle_session_create, handle_session_delete,
    handle_session_get,
};

use crate::config::Config;
use crate::reply::ReplyGenerator;
use crate::store::{CompanionStore, PgCompanionStore};
use anyhow::Result;
use axum::{
    Router,
    http::StatusCode,
    routing::{delete, get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (64KB) — prevents memory exhaustion
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s) — prevents slow-loris attacks
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    /// Durable store; `None` selects the transient "in-memory" mode.
    pub store: Option<Arc<dyn CompanionStore>>,
    pub generator: Arc<ReplyGenerator>,
}

impl AppState {
    /// Persistence-mode label reported on every API response.
    pub fn persistence(&self) -> &'static str {
        if self.store.is_some() {
            "postgres"
        } else {
            "in-memory"
        }
    }
}

/// Build the application router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/auth/session", get(handle_session_get))
        .route("/api/auth/session", post(handle_session_create))
        .route("/api/auth/session", delete(handle_session_delete))
        .route("/api/companions", get(handle_companions_list))
        .route("/api/companions", post(handle_companion_create))
        .route("/api/chat", post(handle_chat))
        .route("/api/conversations", get(handle_conversations_list))
        .route(
            "/api/conversations/{conversation_id}/messages",
            get(handle_conversation_messages),
        )
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

/// Run the HTTP server on the configured host/port.
pub async fn run_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    run_server_with_listener(listener, config).await
}

/// Run the HTTP server from a pre-bound listener (tests bind port 0).
pub async fn run_server_with_listener(
    listener: tokio::net::TcpListener,
    config: Config,
) -> Result<()> {
    let store: Option<Arc<dyn CompanionStore>> = match &config.database.url {
        Some(url) => {
            let store = PgCompanionStore::connect(url).await?;
            Some(Arc::new(store) as Arc<dyn CompanionStore>)
        }
        None => None,
    };

    let generator = Arc::new(ReplyGenerator::from_config(&config.generation)?);
    let state = AppState { store, generator };

    let local_addr = listener.local_addr()?;
    tracing::info!(
        addr = %local_addr,
        persistence = state.persistence(),
        generation = if config.generation.api_key.is_some() {
            config.generation.model.as_str()
        } else {
            "fallback-template"
        },
        "kindred listening"
    );

    let app = router(state);
    axum::serve(listener, app).await?;

    Ok(())
}
