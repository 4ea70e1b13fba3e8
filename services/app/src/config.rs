//! services/app/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

use juriscan_core::history::DEFAULT_HISTORY_LIMIT;

/// OpenAI-compatible endpoint used when only a Gemini key is configured.
pub const GEMINI_OPENAI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub analysis_api_key: String,
    pub analysis_api_base: Option<String>,
    pub analysis_model: String,
    pub prefers_dark: bool,
    /// `None` keeps every history entry.
    pub history_limit: Option<usize>,
    pub allowed_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to keep tests hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Storage Settings ---
        let bind_address_str =
            lookup("BIND_ADDRESS").unwrap_or_else(|| "127.0.0.1:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = lookup("DATABASE_URL")
            .unwrap_or_else(|| "sqlite://juriscan.db?mode=rwc".to_string());

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Analysis Service ---
        let openai_api_key = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());
        let gemini_api_key = lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty());
        let (analysis_api_key, default_base, default_model) = match (openai_api_key, gemini_api_key) {
            (Some(key), _) => (key, None, "gpt-4o"),
            (None, Some(key)) => (key, Some(GEMINI_OPENAI_BASE.to_string()), "gemini-2.5-flash"),
            (None, None) => {
                return Err(ConfigError::MissingVar(
                    "OPENAI_API_KEY or GEMINI_API_KEY".to_string(),
                ))
            }
        };
        let analysis_api_base = lookup("ANALYSIS_API_BASE").or(default_base);
        let analysis_model =
            lookup("ANALYSIS_MODEL").unwrap_or_else(|| default_model.to_string());

        // --- Local Preferences and Retention ---
        let prefers_dark = match lookup("PREFERS_DARK") {
            None => false,
            Some(raw) => raw.parse::<bool>().map_err(|_| {
                ConfigError::InvalidValue(
                    "PREFERS_DARK".to_string(),
                    format!("'{}' is not true or false", raw),
                )
            })?,
        };

        let history_limit = match lookup("HISTORY_LIMIT") {
            None => Some(DEFAULT_HISTORY_LIMIT),
            Some(raw) => match raw.parse::<usize>() {
                Ok(0) => None,
                Ok(limit) => Some(limit),
                Err(e) => {
                    return Err(ConfigError::InvalidValue(
                        "HISTORY_LIMIT".to_string(),
                        e.to_string(),
                    ))
                }
            },
        };

        let allowed_origin =
            lookup("ALLOWED_ORIGIN").unwrap_or_else(|| "http://localhost:5173".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            analysis_api_key,
            analysis_api_base,
            analysis_model,
            prefers_dark,
            history_limit,
            allowed_origin,
        })
    }
}
