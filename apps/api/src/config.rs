use anyhow::{Context, Result};

use crate::llm_client::{DEFAULT_API_BASE, DEFAULT_MODEL};

/// Application configuration loaded from environment variables.
///
/// The Gemini API key is optional at startup: every model call checks for it
/// and fails with a missing-credential error when it is absent.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub port: u16,
    pub rust_log: String,
    /// Sessions idle longer than this are dropped by the background sweeper.
    pub session_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            gemini_model: optional_env("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_api_base: optional_env("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            session_ttl_secs: optional_env("SESSION_TTL_SECS")
                .unwrap_or_else(|| "3600".to_string())
                .parse::<u64>()
                .context("SESSION_TTL_SECS must be a whole number of seconds")?,
        })
    }

    pub fn has_credential(&self) -> bool {
        self.gemini_api_key.is_some()
    }
}

/// Reads an env var, treating unset and blank the same.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
