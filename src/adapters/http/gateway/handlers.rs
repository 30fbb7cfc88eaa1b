//! HTTP handlers for the gateway.
//!
//! The fallback handler turns any request into an `API.request` invocation,
//! then parks on `API._waitForResponse` until a synchronization answers or the
//! configured timeout passes.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Json, Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use thiserror::Error;

use crate::application::engine::{ConceptHandle, EngineError};
use crate::domain::gateway::ApiRequest;
use crate::domain::sync::{fields_of, is_error, Fields, ERROR_KEY};

use super::dto::{ErrorResponse, HealthResponse};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the gateway handlers.
#[derive(Clone)]
pub struct GatewayAppState {
    /// Instrumented `API` concept.
    pub api: ConceptHandle,
    /// How long a request may wait for `API.respond`.
    pub response_timeout: Duration,
}

impl GatewayAppState {
    pub fn new(api: ConceptHandle, response_timeout: Duration) -> Self {
        Self {
            api,
            response_timeout,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse::ok())
}

/// Any other route - hand the request to the synchronizations.
pub async fn forward(
    State(state): State<GatewayAppState>,
    method: Method,
    uri: Uri,
    Query(query): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, BridgeError> {
    let request = ApiRequest {
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        headers: header_fields(&headers),
        query,
        body: parse_body(&body)?,
    };

    let opened = state.api.perform_detached("request", request.into_input()).await?;
    if is_error(&opened) {
        return Err(BridgeError::Rejected(error_message(&opened)));
    }
    let id = opened
        .get("request")
        .and_then(Value::as_str)
        .ok_or_else(|| BridgeError::InvalidResponse("API.request returned no request id".into()))?
        .to_string();

    let timeout_ms = u64::try_from(state.response_timeout.as_millis()).unwrap_or(u64::MAX);
    let rows = state
        .api
        .query(
            "_waitForResponse",
            fields_of(json!({ "request": id, "timeoutMs": timeout_ms })),
        )
        .await;

    match rows.into_iter().next() {
        Some(row) => render(row),
        None => {
            tracing::debug!(request = %id, method = %method, path = %uri.path(), "No response before timeout");
            Ok(StatusCode::NO_CONTENT.into_response())
        }
    }
}

/// Lowercased header names; repeated headers are joined with `", "`.
fn header_fields(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut fields: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        fields
            .entry(name.as_str().to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    fields
}

/// An empty body is `null`; anything else must be JSON.
fn parse_body(body: &Bytes) -> Result<Value, BridgeError> {
    if body.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|err| BridgeError::MalformedJson(err.to_string()))
}

fn render(row: Fields) -> Result<Response, BridgeError> {
    let status = row
        .get("status")
        .and_then(Value::as_u64)
        .and_then(|status| u16::try_from(status).ok())
        .and_then(|status| StatusCode::from_u16(status).ok())
        .ok_or_else(|| BridgeError::InvalidResponse("response carries no valid status".into()))?;
    let body = row.get("body").cloned().unwrap_or(Value::Null);
    Ok((status, Json(body)).into_response())
}

fn error_message(output: &Fields) -> String {
    output
        .get(ERROR_KEY)
        .and_then(Value::as_str)
        .unwrap_or("request rejected")
        .to_string()
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Failures of the bridge itself. Application-level errors travel as
/// ordinary responses produced by synchronizations.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Malformed JSON body: {0}")]
    MalformedJson(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            BridgeError::MalformedJson(_) => (StatusCode::BAD_REQUEST, "MALFORMED_JSON"),
            BridgeError::Rejected(_) => (StatusCode::BAD_REQUEST, "REQUEST_REJECTED"),
            BridgeError::InvalidResponse(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INVALID_RESPONSE"),
            BridgeError::Engine(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Gateway failure");
        }
        let body = ErrorResponse::new(error_code, self.to_string());
        (status, Json(body)).into_response()
    }
}
