//! Concept adapters - the API gateway plus in-memory reference concepts.
//!
//! The reference concepts keep their state in process memory and exist so
//! that the bundled synchronizations can run end to end.

mod api;
mod membership;
mod project;
mod team;

pub use api::{ApiConcept, API};
pub use membership::{MembershipConcept, MembershipStatus, MEMBERSHIP};
pub use project::{ProjectConcept, PROJECT};
pub use team::{TeamConcept, TEAM};
