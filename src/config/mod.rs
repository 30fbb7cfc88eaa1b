//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `CONCEPT_SYNC` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use concept_sync::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod engine;
mod error;
mod gateway;
mod server;

pub use engine::{EngineConfig, MAX_DEPTH_LIMIT};
pub use error::{ConfigError, ValidationError};
pub use gateway::GatewayConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a runnable
/// configuration. Load using [`AppConfig::load()`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Synchronization engine limits
    #[serde(default)]
    pub engine: EngineConfig,

    /// API gateway wait and retention
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CONCEPT_SYNC` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `CONCEPT_SYNC__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `CONCEPT_SYNC__ENGINE__MAX_DEPTH=16` -> `engine.max_depth = 16`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CONCEPT_SYNC")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// Besides per-section range checks, the gateway wait must end before
    /// the server's own request timeout fires.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.engine.validate()?;
        self.gateway.validate()?;

        let server_ms = self.server.request_timeout_secs.saturating_mul(1000);
        if self.gateway.response_timeout_ms >= server_ms {
            return Err(ValidationError::ResponseTimeoutExceedsRequestTimeout {
                gateway_ms: self.gateway.response_timeout_ms,
                server_ms,
            });
        }
        Ok(())
    }
}
