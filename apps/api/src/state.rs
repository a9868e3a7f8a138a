use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::interview::session::SessionRegistry;
use crate::llm_client::GenerationClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Pluggable generation backend. Production: `GroqClient`; tests script it.
    pub llm: Arc<dyn GenerationClient>,
    /// In-memory session registry. Bounded by the idle-TTL sweeper in main.
    pub sessions: Arc<SessionRegistry>,
    /// Retained for handlers that need runtime configuration; none do today.
    #[allow(dead_code)]
    pub config: Config,
}
