//! Reference synchronizations wiring the API gateway to the reference concepts.
//!
//! Each function returns `(name, factory)` pairs ready for
//! `SyncEngine::register`.

mod projects;
mod teams;

pub use projects::project_syncs;
pub use teams::team_syncs;

use serde_json::Value;

use crate::domain::sync::{Frame, Var};

/// Reads `key` out of the JSON object bound to `object`.
pub(crate) fn lookup(frame: &Frame, object: &Var, key: &str) -> Option<Value> {
    frame
        .get(object)?
        .get(key)
        .filter(|value| !value.is_null())
        .cloned()
}
