mod analysis;
mod config;
mod errors;
mod llm_client;
mod models;
mod revision;
mod routes;
mod state;
mod workflow;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Rectify API v{}", env!("CARGO_PKG_VERSION"));

    // The service still starts without a key; model calls fail with 503 until one is set.
    let llm = LlmClient::new(
        config.gemini_api_key.clone(),
        config.gemini_api_base.clone(),
        config.gemini_model.clone(),
    );
    if config.has_credential() {
        info!("LLM client initialized (model: {})", llm.model());
    } else {
        warn!("GEMINI_API_KEY is not set; analysis and revision requests will be rejected");
    }

    let state = AppState::new(Arc::new(llm), config.clone());

    // Sweep abandoned sessions; each can hold an uploaded document.
    let sessions = state.workflow.sessions().clone();
    let session_ttl = chrono::Duration::seconds(config.session_ttl_secs as i64);
    tokio::spawn(async move {
        let mut sweep = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            sweep.tick().await;
            sessions.evict_idle(session_ttl).await;
        }
    });

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the UI host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
