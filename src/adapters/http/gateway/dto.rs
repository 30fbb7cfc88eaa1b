//! Data transfer objects for the gateway endpoints.

use serde::{Deserialize, Serialize};

/// Health probe body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Standard error response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_response_carries_code_and_message() {
        let body = serde_json::to_value(ErrorResponse::new("MALFORMED_JSON", "bad")).unwrap();
        assert_eq!(body, json!({"error_code": "MALFORMED_JSON", "message": "bad"}));
    }

    #[test]
    fn health_reports_ok() {
        assert_eq!(serde_json::to_value(HealthResponse::ok()).unwrap(), json!({"status": "ok"}));
    }
}
