//! Adapters - Implementations of port interfaces.
//!
//! - `concepts` - The API gateway concept and in-memory reference concepts
//! - `http` - The axum bridge between HTTP and the gateway concept

pub mod concepts;
pub mod http;
