//! API gateway configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// How long the HTTP bridge waits for `API.respond`
    #[serde(default = "default_response_timeout")]
    pub response_timeout_ms: u64,

    /// How long an unawaited response slot is kept
    #[serde(default = "default_retention")]
    pub retention_secs: u64,
}

impl GatewayConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    /// Validate gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.response_timeout_ms == 0 {
            return Err(ValidationError::InvalidResponseTimeout);
        }
        if self.retention_secs == 0 {
            return Err(ValidationError::InvalidRetention);
        }
        if self.retention() < self.response_timeout() {
            return Err(ValidationError::RetentionShorterThanResponseTimeout {
                retention_secs: self.retention_secs,
                response_timeout_ms: self.response_timeout_ms,
            });
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: default_response_timeout(),
            retention_secs: default_retention(),
        }
    }
}

fn default_response_timeout() -> u64 {
    10_000
}

fn default_retention() -> u64 {
    60
}
