//! Per-request lifecycle of the API gateway.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

/// Status of one gateway request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    /// `request` assigned an id; no response yet.
    Pending,

    /// `respond` delivered a status and body.
    Responded,

    /// The waiter's deadline passed before any response.
    TimedOut,
}

impl StateMachine for RequestState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use RequestState::*;
        matches!((self, target), (Pending, Responded) | (Pending, TimedOut))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use RequestState::*;
        match self {
            Pending => vec![Responded, TimedOut],
            Responded | TimedOut => vec![],
        }
    }
}
