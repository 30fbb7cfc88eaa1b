//! Engine error types

use thiserror::Error;

/// Misuse of the engine: bad registrations, unknown targets and runaway cascades.
///
/// Domain failures never appear here; concepts report them as `{error}` outputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Concept '{0}' is not instrumented")]
    UnknownConcept(String),

    #[error("Concept '{concept}' has no action '{action}'")]
    UnknownAction { concept: String, action: String },

    #[error("Concept '{0}' is already instrumented")]
    DuplicateConcept(String),

    #[error("Concept '{concept}' is invalid: {reason}")]
    InvalidConcept { concept: String, reason: String },

    #[error("Synchronization '{0}' is already registered")]
    DuplicateSync(String),

    #[error("Synchronization '{0}' is not registered")]
    UnknownSync(String),

    #[error("Synchronization '{name}' is invalid: {reason}")]
    InvalidSync { name: String, reason: String },

    #[error("Invocation of {action} at depth {depth} exceeds max depth {limit}")]
    DepthExceeded {
        action: String,
        depth: u32,
        limit: u32,
    },
}
