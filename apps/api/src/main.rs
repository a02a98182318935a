mod config;
mod errors;
mod generation;
mod ingest;
mod llm_client;
mod prompts;
mod routes;
mod session;
mod state;
mod tokenizer;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::session::SessionStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Fails on missing required env vars
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Highlight API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::from_config(&config)?;
    info!(
        "LLM client initialized (backend: {}, model: {}, max tokens: {})",
        llm.backend_name(),
        llm.model_id(),
        llm.max_allowable_tokens()
    );
    if !llm.tokens().is_exact() {
        info!(
            "No tokenizer for model '{}'; token counts are estimated",
            llm.model_id()
        );
    }

    // Session store, with idle sessions swept in the background
    let sessions = SessionStore::default();
    tokio::spawn(sessions.clone().expire_idle(config.session_ttl));
    info!("Session store initialized (idle TTL: {}s)", config.session_ttl.as_secs());

    // Build app state
    let state = AppState {
        llm,
        sessions,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
