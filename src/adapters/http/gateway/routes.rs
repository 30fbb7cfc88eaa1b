//! Axum router configuration for the gateway.

use axum::{routing::get, Router};

use super::handlers::{forward, health, GatewayAppState};

/// Create the gateway routes.
///
/// # Routes
/// - `GET /health` - Liveness probe
/// - fallback - Every other request goes through `API.request`
pub fn gateway_routes() -> Router<GatewayAppState> {
    Router::new()
        .route("/health", get(health))
        .fallback(forward)
}

/// Create the gateway router with its state attached.
pub fn gateway_router(state: GatewayAppState) -> Router {
    gateway_routes().with_state(state)
}
