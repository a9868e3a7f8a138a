mod config;
mod db;
mod errors;
mod interview;
mod llm_client;
mod models;
mod report;
mod routes;
mod state;
mod transcript;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::interview::session::SessionRegistry;
use crate::llm_client::GroqClient;
use crate::routes::build_router;
use crate::state::AppState;

const SESSION_SWEEP_INTERVAL_SECS: u64 = 60;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Parley API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url, config.db_max_connections).await?;

    // Initialize generation client
    let llm = Arc::new(GroqClient::new(
        config.groq_api_key.clone(),
        config.llm_timeout_secs,
    ));
    info!("Generation client initialized (model: {})", llm_client::MODEL);

    // Initialize the session registry and its idle-eviction sweeper
    let sessions = Arc::new(SessionRegistry::new());
    let sweeper_sessions = sessions.clone();
    let idle_ttl = Duration::from_secs(config.session_idle_ttl_secs);
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(SESSION_SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            sweeper_sessions.evict_idle(idle_ttl);
        }
    });

    // Build app state
    let state = AppState {
        db,
        llm,
        sessions,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
