//! Application layer - the synchronization engine and the bundled
//! synchronizations that drive the reference concepts.

pub mod engine;
pub mod syncs;
