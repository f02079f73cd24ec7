//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

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
    /// Base URL of the Google Books volumes API.
    pub books_api_base: String,
    /// Result cap for free-text catalog searches.
    pub books_search_limit: u32,
    /// Origin the mobile dev client is served from.
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Catalog Settings ---
        let books_api_base = std::env::var("BOOKS_API_BASE")
            .unwrap_or_else(|_| "https://www.googleapis.com/books/v1".to_string());

        let books_search_limit_str =
            std::env::var("BOOKS_SEARCH_LIMIT").unwrap_or_else(|_| "20".to_string());
        let books_search_limit = books_search_limit_str.parse::<u32>().map_err(|_| {
            ConfigError::InvalidValue(
                "BOOKS_SEARCH_LIMIT".to_string(),
                format!("'{}' is not a valid count", books_search_limit_str),
            )
        })?;

        // Expo serves the dev client from 8081.
        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:8081".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            books_api_base,
            books_search_limit,
            cors_origin,
        })
    }
}
