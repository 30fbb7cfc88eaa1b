//! HTTP adapter for the API gateway concept.
//!
//! Exposes the synchronization engine over HTTP:
//! - `GET /health` - Liveness probe
//! - every other method and path is handed to `API.request`, and the
//!   response produced by the synchronizations is rendered back

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::ErrorResponse;
pub use handlers::{BridgeError, GatewayAppState};
pub use routes::{gateway_router, gateway_routes};
