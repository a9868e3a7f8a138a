use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub groq_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub db_max_connections: u32,
    /// Deadline for a single generation call. Expiry surfaces as
    /// `ServiceUnavailable` with no state mutation.
    pub llm_timeout_secs: u64,
    /// Sessions idle longer than this are evicted from the in-memory registry.
    pub session_idle_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            groq_api_key: require_env("GROQ_API_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse::<u32>()
                .context("DB_MAX_CONNECTIONS must be a number")?,
            llm_timeout_secs: std::env::var("LLM_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u64>()
                .context("LLM_TIMEOUT_SECS must be a number of seconds")?,
            session_idle_ttl_secs: std::env::var("SESSION_IDLE_TTL_SECS")
                .unwrap_or_else(|_| "7200".to_string())
                .parse::<u64>()
                .context("SESSION_IDLE_TTL_SECS must be a number of seconds")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
