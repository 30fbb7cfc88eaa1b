//! Concept Sync - a reactive synchronization engine for independent concepts.
//!
//! Concepts are self-contained state machines exposing actions and queries.
//! Synchronizations are declarative `when / where / then` rules that react to
//! recorded action invocations, enrich their bindings through concept queries,
//! and dispatch further actions. The `API` concept turns HTTP requests into
//! invocations so whole endpoints can be written as synchronizations.

pub mod adapters;
pub mod application;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod logging;
pub mod ports;

pub use bootstrap::Application;
