//! Domain layer containing the synchronization vocabulary and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machines)
//! - `sync` - Fields, variables, patterns, frames, invocation records and declarations
//! - `gateway` - API gateway request lifecycle and request/response values

pub mod foundation;
pub mod gateway;
pub mod sync;
