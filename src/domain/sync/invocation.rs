//! Immutable records of completed action invocations.

use serde::Serialize;

use crate::domain::foundation::{FlowId, InvocationId, Timestamp};

use super::fields::{is_error, Fields};
use super::pattern::ActionRef;

/// A settled action call as seen by the matcher.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationRecord {
    pub id: InvocationId,
    pub concept: String,
    pub action: String,
    pub input: Fields,
    pub output: Fields,
    pub flow: FlowId,
    /// Number of synchronization hops from the root invocation.
    pub depth: u32,
    /// The invocation whose synchronization dispatched this one.
    pub cause: Option<InvocationId>,
    /// Name of the dispatching synchronization, if any.
    pub sync: Option<String>,
    pub timestamp: Timestamp,
}

impl InvocationRecord {
    /// Record for an invocation made directly by a caller outside the engine.
    pub fn root(
        concept: impl Into<String>,
        action: impl Into<String>,
        input: Fields,
        output: Fields,
        flow: FlowId,
    ) -> Self {
        Self {
            id: InvocationId::new(),
            concept: concept.into(),
            action: action.into(),
            input,
            output,
            flow,
            depth: 0,
            cause: None,
            sync: None,
            timestamp: Timestamp::now(),
        }
    }

    pub fn action_ref(&self) -> ActionRef {
        ActionRef::new(&self.concept, &self.action)
    }

    pub fn is_error(&self) -> bool {
        is_error(&self.output)
    }
}
