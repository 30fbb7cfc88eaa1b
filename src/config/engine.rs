//! Synchronization engine configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Hard ceiling for `max_depth`.
pub const MAX_DEPTH_LIMIT: u32 = 1024;

/// Engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of synchronization hops below a root invocation
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Seconds after which an idle flow's history is discarded
    #[serde(default = "default_flow_ttl")]
    pub flow_ttl_secs: u64,
}

impl EngineConfig {
    pub fn flow_ttl(&self) -> Duration {
        Duration::from_secs(self.flow_ttl_secs)
    }

    /// Validate engine configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_depth == 0 || self.max_depth > MAX_DEPTH_LIMIT {
            return Err(ValidationError::InvalidMaxDepth {
                max: MAX_DEPTH_LIMIT,
            });
        }
        if self.flow_ttl_secs == 0 {
            return Err(ValidationError::InvalidFlowTtl);
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            flow_ttl_secs: default_flow_ttl(),
        }
    }
}

fn default_max_depth() -> u32 {
    32
}

fn default_flow_ttl() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.max_depth, 32);
        assert_eq!(config.flow_ttl(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_or_huge_depth_is_rejected() {
        for max_depth in [0, MAX_DEPTH_LIMIT + 1] {
            let config = EngineConfig {
                max_depth,
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let config = EngineConfig {
            flow_ttl_secs: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidFlowTtl)));
    }
}
