//! API gateway concept.
//!
//! Turns the reactive cascade behind a request into a single response.
//! `request` opens a slot, synchronizations eventually call `respond`, and
//! `_waitForResponse` suspends its caller until one of those two things
//! meet or the deadline passes.
//!
//! # Usage
//!
//! ```ignore
//! let api = engine.instrument(Arc::new(ApiConcept::new(&config.gateway)))?;
//! let out = api.perform_detached("request", request.into_input()).await?;
//! let rows = api.query("_waitForResponse", fields_of(json!({"request": out["request"]}))).await;
//! ```

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};
use tokio::sync::watch;

use crate::config::GatewayConfig;
use crate::domain::foundation::{DomainError, ErrorCode, RequestId, StateMachine, ValidationError};
use crate::domain::gateway::{ApiResponse, RequestState, DEFAULT_STATUS};
use crate::domain::sync::{error_output, fields_of, into_output, require_str, Fields};
use crate::ports::Concept;

/// Concept name used in synchronization declarations.
pub const API: &str = "API";

struct Slot {
    state: RequestState,
    opened: Instant,
    response: watch::Sender<Option<ApiResponse>>,
}

impl Slot {
    fn new() -> Self {
        let (response, _) = watch::channel(None);
        Self {
            state: RequestState::Pending,
            opened: Instant::now(),
            response,
        }
    }
}

/// In-process request/response rendezvous.
pub struct ApiConcept {
    slots: DashMap<RequestId, Slot>,
    default_timeout: Duration,
    retention: Duration,
}

impl ApiConcept {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            slots: DashMap::new(),
            default_timeout: config.response_timeout(),
            retention: config.retention(),
        }
    }

    /// Number of open slots.
    pub fn pending(&self) -> usize {
        self.slots.len()
    }

    fn request(&self, input: &Fields) -> Result<Fields, DomainError> {
        require_str(input, "method")?;
        require_str(input, "path")?;
        self.sweep_expired();

        let id = RequestId::new();
        self.slots.insert(id, Slot::new());
        tracing::debug!(request = %id, "Request opened");
        Ok(fields_of(json!({ "request": id.to_string() })))
    }

    fn respond(&self, input: &Fields) -> Result<Fields, DomainError> {
        let id = request_id(input)?;
        let status = match input.get("status") {
            None | Some(Value::Null) => DEFAULT_STATUS,
            Some(value) => value
                .as_u64()
                .and_then(|s| u16::try_from(s).ok())
                .filter(|s| (100..=599).contains(s))
                .ok_or_else(|| ValidationError::invalid_format("status", "expected an HTTP status code"))?,
        };
        let body = input.get("body").cloned().unwrap_or_else(|| json!({}));

        let mut slot = self
            .slots
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Request"))?;
        let current = slot.state;
        slot.state = current.transition_to(RequestState::Responded).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Request already {}", describe(current)),
            )
        })?;
        slot.response.send_replace(Some(ApiResponse::new(status, body)));
        tracing::debug!(request = %id, status, "Request answered");

        Ok(fields_of(json!({ "request": id.to_string() })))
    }

    async fn wait_for_response(&self, input: &Fields) -> Vec<Fields> {
        let Ok(id) = request_id(input) else {
            return Vec::new();
        };
        let timeout = input
            .get("timeoutMs")
            .and_then(Value::as_u64)
            .map(Duration::from_millis)
            .unwrap_or(self.default_timeout);

        let Some(mut receiver) = self.slots.get(&id).map(|slot| slot.response.subscribe()) else {
            return Vec::new();
        };

        let mut response = {
            let waited = tokio::time::timeout(timeout, receiver.wait_for(Option::is_some)).await;
            match waited {
                Ok(Ok(value)) => value.clone(),
                _ => None,
            }
        };

        if response.is_none() {
            if let Some(mut slot) = self.slots.get_mut(&id) {
                match slot.state.transition_to(RequestState::TimedOut) {
                    Ok(next) => slot.state = next,
                    // answered between the deadline and now
                    Err(_) => response = slot.response.borrow().clone(),
                }
            }
        }
        self.slots.remove(&id);

        match response {
            Some(response) => vec![response.to_row()],
            None => {
                tracing::debug!(request = %id, timeout_ms = timeout.as_millis() as u64, "Request timed out");
                Vec::new()
            }
        }
    }

    /// Drops slots older than `retention` that nobody is waiting on.
    fn sweep_expired(&self) {
        let retention = self.retention;
        self.slots.retain(|_, slot| {
            slot.response.receiver_count() > 0 || slot.opened.elapsed() < retention
        });
    }
}

fn request_id(input: &Fields) -> Result<RequestId, ValidationError> {
    require_str(input, "request")?
        .parse()
        .map_err(|_| ValidationError::invalid_format("request", "expected a request id"))
}

fn describe(state: RequestState) -> &'static str {
    match state {
        RequestState::Pending => "pending",
        RequestState::Responded => "answered",
        RequestState::TimedOut => "timed out",
    }
}

#[async_trait]
impl Concept for ApiConcept {
    fn name(&self) -> &str {
        API
    }

    fn actions(&self) -> &[&'static str] {
        &["request", "respond"]
    }

    fn queries(&self) -> &[&'static str] {
        &["_waitForResponse"]
    }

    async fn perform(&self, action: &str, input: Fields) -> Fields {
        match action {
            "request" => into_output(self.request(&input)),
            "respond" => into_output(self.respond(&input)),
            other => error_output(format!("Unknown action '{}'", other)),
        }
    }

    async fn query(&self, name: &str, input: Fields) -> Vec<Fields> {
        match name {
            "_waitForResponse" => self.wait_for_response(&input).await,
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn api() -> Arc<ApiConcept> {
        Arc::new(ApiConcept::new(&GatewayConfig::default()))
    }

    async fn open(api: &ApiConcept) -> String {
        let out = api
            .perform("request", fields_of(json!({"method": "GET", "path": "/x"})))
            .await;
        out["request"].as_str().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn respond_then_wait_returns_response() {
        let api = api();
        let id = open(&api).await;

        let out = api
            .perform("respond", fields_of(json!({"request": id, "status": 201, "body": {"ok": true}})))
            .await;
        assert_eq!(out["request"], json!(id));

        let rows = api
            .query("_waitForResponse", fields_of(json!({"request": id, "timeoutMs": 100})))
            .await;
        assert_eq!(rows, vec![fields_of(json!({"status": 201, "body": {"ok": true}}))]);
        assert_eq!(api.pending(), 0);
    }

    #[tokio::test]
    async fn wait_sees_response_delivered_later() {
        let api = api();
        let id = open(&api).await;

        let responder = {
            let api = Arc::clone(&api);
            let id = id.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                api.perform("respond", fields_of(json!({"request": id}))).await
            })
        };

        let rows = api
            .query("_waitForResponse", fields_of(json!({"request": id, "timeoutMs": 1000})))
            .await;
        responder.await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["status"], json!(200));
        assert_eq!(rows[0]["body"], json!({}));
    }

    #[tokio::test]
    async fn wait_times_out_with_no_rows() {
        let api = api();
        let id = open(&api).await;

        let started = Instant::now();
        let rows = api
            .query("_waitForResponse", fields_of(json!({"request": id, "timeoutMs": 50})))
            .await;

        assert!(rows.is_empty());
        assert!(started.elapsed() < Duration::from_millis(500));

        let late = api.perform("respond", fields_of(json!({"request": id}))).await;
        assert!(late.contains_key("error"));
    }

    #[tokio::test]
    async fn respond_twice_is_an_error() {
        let api = api();
        let id = open(&api).await;

        api.perform("respond", fields_of(json!({"request": id}))).await;
        let second = api.perform("respond", fields_of(json!({"request": id}))).await;

        assert_eq!(second["error"], json!("Request already answered"));
    }

    #[tokio::test]
    async fn unknown_request_is_reported() {
        let api = api();
        let unknown = RequestId::new().to_string();

        let out = api.perform("respond", fields_of(json!({"request": unknown}))).await;
        assert_eq!(out["error"], json!("Request not found"));

        let rows = api
            .query("_waitForResponse", fields_of(json!({"request": unknown, "timeoutMs": 10})))
            .await;
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn sweep_spares_slots_with_a_waiter() {
        let api = Arc::new(ApiConcept {
            slots: DashMap::new(),
            default_timeout: Duration::from_secs(5),
            retention: Duration::from_millis(20),
        });
        let waited = open(&api).await;
        let abandoned = open(&api).await;

        let waiter = {
            let api = Arc::clone(&api);
            let id = waited.clone();
            tokio::spawn(async move {
                api.query("_waitForResponse", fields_of(json!({"request": id, "timeoutMs": 2000})))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(60)).await;
        // opening another request sweeps expired slots
        open(&api).await;

        let answered = api.perform("respond", fields_of(json!({"request": waited}))).await;
        assert_eq!(answered["request"], json!(waited));
        let rows = waiter.await.unwrap();
        assert_eq!(rows.len(), 1);

        let late = api.perform("respond", fields_of(json!({"request": abandoned}))).await;
        assert_eq!(late["error"], json!("Request not found"));
    }

    #[tokio::test]
    async fn request_requires_method_and_path() {
        let api = api();
        let out = api.perform("request", fields_of(json!({"path": "/x"}))).await;
        assert!(out.contains_key("error"));
        assert_eq!(api.pending(), 0);
    }

    #[tokio::test]
    async fn invalid_status_is_rejected() {
        let api = api();
        let id = open(&api).await;
        let out = api
            .perform("respond", fields_of(json!({"request": id, "status": 42})))
            .await;
        assert!(out.contains_key("error"));
    }
}
