//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid socket address: {0}")]
    InvalidAddress(String),

    #[error("Invalid CORS origin '{0}': expected an http(s) origin")]
    InvalidCorsOrigin(String),

    #[error("Engine max_depth must be between 1 and {max}")]
    InvalidMaxDepth { max: u32 },

    #[error("Engine flow_ttl_secs must be greater than zero")]
    InvalidFlowTtl,

    #[error("Gateway response_timeout_ms must be greater than zero")]
    InvalidResponseTimeout,

    #[error("Gateway response timeout ({gateway_ms}ms) must be shorter than the server request timeout ({server_ms}ms)")]
    ResponseTimeoutExceedsRequestTimeout { gateway_ms: u64, server_ms: u64 },

    #[error("Gateway retention_secs must be greater than zero")]
    InvalidRetention,

    #[error("Gateway retention ({retention_secs}s) must cover the response timeout ({response_timeout_ms}ms)")]
    RetentionShorterThanResponseTimeout {
        retention_secs: u64,
        response_timeout_ms: u64,
    },
}
