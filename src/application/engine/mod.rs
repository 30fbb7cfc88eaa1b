//! Synchronization engine - instrumentation, matching, where-clauses and
//! then-dispatch over registered concepts.
//!
//! # Example
//!
//! ```ignore
//! let engine = SyncEngine::new(config.engine.clone());
//! let team = engine.instrument(Arc::new(TeamConcept::new()))?;
//! engine.register(team_syncs(&api, &team))?;
//! team.perform("create", input).await?;
//! ```

mod dispatch;
mod error;
mod flow;
mod handle;
mod matcher;
mod registry;
mod sync_engine;

pub use error::EngineError;
pub use handle::{ConceptHandle, QueryRef};
pub use sync_engine::SyncEngine;
