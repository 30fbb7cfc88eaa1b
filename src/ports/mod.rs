//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the engine and the outside world. Adapters implement these ports.
//!
//! - `Concept` - A self-contained unit of state exposing actions and queries

mod concept;

pub use concept::Concept;
