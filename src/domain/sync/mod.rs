//! Synchronization vocabulary: fields, variables, patterns, frames, invocation
//! records and declarations.
//!
//! Everything here is pure data plus the matching algebra. Executing
//! synchronizations against live concepts lives in `application::engine`.

mod fields;
mod frame;
mod invocation;
mod pattern;
mod synchronization;
mod vars;

pub use fields::{
    error_output, fields_of, into_output, is_error, optional_str, require_str, Fields, ERROR_KEY,
};
pub use frame::{Frame, Frames};
pub use invocation::InvocationRecord;
pub use pattern::{ActionPattern, ActionRef, PatternField, PatternObject, UnboundVariable};
pub use synchronization::{sync, SyncDeclaration, SyncFactory, Synchronization, WhereClause};
pub use vars::{Var, Vars};
