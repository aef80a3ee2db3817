//! Application configuration

use std::env;

use anyhow::{Context, Result};

/// Default Gemini API base URL.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default per-request timeout for model calls.
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

/// Default time a game may go untouched before it is expired.
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 60 * 60;

/// Default interval between idle-game sweeps.
pub const DEFAULT_SESSION_SWEEP_SECS: u64 = 60;

/// Model identifiers used by each operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub scenario: String,
    pub evaluation: String,
    pub analysis: String,
    pub coach: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            scenario: "gemini-2.5-flash".to_string(),
            evaluation: "gemini-2.5-flash-lite".to_string(),
            analysis: "gemini-3-pro-preview".to_string(),
            coach: "gemini-2.5-flash".to_string(),
        }
    }
}

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Gemini API key; calls fail (and fall back) when absent
    pub gemini_api_key: Option<String>,
    /// Gemini API base URL
    pub gemini_base_url: String,
    /// Per-request timeout for model calls, in seconds
    pub llm_timeout_secs: u64,
    pub models: ModelConfig,

    /// Seconds a game may go untouched before it is expired
    pub session_idle_secs: u64,
    /// Seconds between idle-game sweeps
    pub session_sweep_secs: u64,

    /// HTTP server bind host
    pub server_host: String,
    /// HTTP server port
    pub server_port: u16,
    /// Comma-separated CORS origins, or `*`
    pub cors_allowed_origins: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = ModelConfig::default();

        Ok(Self {
            gemini_api_key: var("GEMINI_API_KEY").or_else(|| var("API_KEY")),
            gemini_base_url: var("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            llm_timeout_secs: match var("TRAILWISE_LLM_TIMEOUT_SECS") {
                Some(raw) => raw
                    .parse()
                    .context("TRAILWISE_LLM_TIMEOUT_SECS must be a whole number of seconds")?,
                None => DEFAULT_LLM_TIMEOUT_SECS,
            },
            models: ModelConfig {
                scenario: var("TRAILWISE_SCENARIO_MODEL").unwrap_or(defaults.scenario),
                evaluation: var("TRAILWISE_EVALUATION_MODEL").unwrap_or(defaults.evaluation),
                analysis: var("TRAILWISE_ANALYSIS_MODEL").unwrap_or(defaults.analysis),
                coach: var("TRAILWISE_COACH_MODEL").unwrap_or(defaults.coach),
            },
            session_idle_secs: match var("TRAILWISE_SESSION_IDLE_SECS") {
                Some(raw) => raw
                    .parse()
                    .context("TRAILWISE_SESSION_IDLE_SECS must be a whole number of seconds")?,
                None => DEFAULT_SESSION_IDLE_SECS,
            },
            session_sweep_secs: match var("TRAILWISE_SESSION_SWEEP_SECS") {
                Some(raw) => raw
                    .parse::<u64>()
                    .context("TRAILWISE_SESSION_SWEEP_SECS must be a whole number of seconds")?
                    .max(1),
                None => DEFAULT_SESSION_SWEEP_SECS,
            },

            server_host: var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: var("SERVER_PORT")
                .or_else(|| var("PORT"))
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            cors_allowed_origins: var("CORS_ALLOWED_ORIGINS"),
        })
    }
}
