//! API gateway domain - request lifecycle and request/response values.

mod request;
mod state;

pub use request::{ApiRequest, ApiResponse, DEFAULT_STATUS};
pub use state::RequestState;
