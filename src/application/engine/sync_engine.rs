//! The synchronization engine instance.

use std::collections::HashSet;
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::domain::sync::{SyncFactory, Synchronization, Vars};
use crate::ports::Concept;

use super::error::EngineError;
use super::flow::FlowTable;
use super::handle::ConceptHandle;
use super::registry::SyncRegistry;

pub(crate) struct EngineInner {
    pub(crate) concepts: DashMap<String, Arc<dyn Concept>>,
    pub(crate) registry: SyncRegistry,
    pub(crate) flows: Arc<FlowTable>,
    pub(crate) config: EngineConfig,
}

/// Owns the instrumented concepts, the registered synchronizations and the
/// live flows. Cloning shares the same engine.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl SyncEngine {
    pub fn new(config: EngineConfig) -> Self {
        let flows = Arc::new(FlowTable::new(config.flow_ttl()));
        Self {
            inner: Arc::new(EngineInner {
                concepts: DashMap::new(),
                registry: SyncRegistry::new(),
                flows,
                config,
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Wraps a concept so that its actions are recorded and synchronized.
    ///
    /// # Errors
    ///
    /// - `InvalidConcept` if the name is empty, an action name starts with
    ///   `_` or a query name does not
    /// - `DuplicateConcept` if a concept with the same name is instrumented
    pub fn instrument(&self, concept: Arc<dyn Concept>) -> Result<ConceptHandle, EngineError> {
        validate_concept(concept.as_ref())?;
        let name = concept.name().to_string();
        match self.inner.concepts.entry(name.clone()) {
            Entry::Occupied(_) => return Err(EngineError::DuplicateConcept(name)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&concept));
            }
        }
        tracing::info!(
            concept = %name,
            actions = ?concept.actions(),
            queries = ?concept.queries(),
            "Concept instrumented"
        );
        Ok(ConceptHandle::new(concept, Arc::clone(&self.inner)))
    }

    /// Instruments each concept in order, stopping at the first failure.
    pub fn instrument_all<I>(&self, concepts: I) -> Result<Vec<ConceptHandle>, EngineError>
    where
        I: IntoIterator<Item = Arc<dyn Concept>>,
    {
        concepts.into_iter().map(|c| self.instrument(c)).collect()
    }

    /// Handle for an already instrumented concept.
    pub fn handle(&self, name: &str) -> Result<ConceptHandle, EngineError> {
        let concept = self
            .inner
            .concepts
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| EngineError::UnknownConcept(name.to_string()))?;
        Ok(ConceptHandle::new(concept, Arc::clone(&self.inner)))
    }

    /// Registers a batch of named synchronizations.
    ///
    /// Each factory is called once with a fresh [`Vars`]. The batch is
    /// validated as a whole before anything is registered.
    ///
    /// # Errors
    ///
    /// - `DuplicateSync` if a name repeats within the batch or is registered
    /// - `InvalidSync` for an empty `when` or a reference to an unknown
    ///   concept or action
    pub fn register<I, N>(&self, syncs: I) -> Result<(), EngineError>
    where
        I: IntoIterator<Item = (N, SyncFactory)>,
        N: Into<String>,
    {
        let mut batch = Vec::new();
        let mut seen = HashSet::new();
        for (name, factory) in syncs {
            let name = name.into();
            if !seen.insert(name.clone()) || self.inner.registry.contains(&name) {
                return Err(EngineError::DuplicateSync(name));
            }
            let mut vars = Vars::new();
            let sync = Synchronization::new(name, factory(&mut vars));
            self.validate_sync(&sync)?;
            batch.push(sync);
        }

        for sync in batch {
            let name = sync.name.clone();
            self.inner.registry.insert(sync)?;
            tracing::info!(sync = %name, "Synchronization registered");
        }
        Ok(())
    }

    pub fn unregister(&self, name: &str) -> Result<(), EngineError> {
        if self.inner.registry.remove(name).is_none() {
            return Err(EngineError::UnknownSync(name.to_string()));
        }
        tracing::info!(sync = %name, "Synchronization unregistered");
        Ok(())
    }

    /// Registered synchronization names, sorted.
    pub fn sync_names(&self) -> Vec<String> {
        self.inner.registry.names()
    }

    pub fn sync_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Number of flows with retained history.
    pub fn active_flows(&self) -> usize {
        self.inner.flows.len()
    }

    /// Discards flows with nothing in progress that have been idle for longer
    /// than `flow_ttl`.
    pub fn sweep_flows(&self) -> usize {
        self.inner.flows.sweep()
    }

    /// Spawns a task that sweeps idle flows every half TTL.
    ///
    /// The task ends on its own once every clone of the engine is dropped.
    pub fn spawn_flow_sweeper(&self) -> JoinHandle<()> {
        let engine: Weak<EngineInner> = Arc::downgrade(&self.inner);
        let period = (self.inner.flows.ttl() / 2).max(Duration::from_millis(100));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = engine.upgrade() else {
                    break;
                };
                let removed = inner.flows.sweep();
                if removed > 0 {
                    tracing::debug!(removed, "Swept idle flows");
                }
            }
        })
    }

    fn validate_sync(&self, sync: &Synchronization) -> Result<(), EngineError> {
        let invalid = |reason: String| EngineError::InvalidSync {
            name: sync.name.clone(),
            reason,
        };
        if sync.when.is_empty() {
            return Err(invalid("when clause is empty".into()));
        }
        for target in sync.referenced() {
            let concept = self
                .inner
                .concepts
                .get(target.concept())
                .map(|entry| Arc::clone(entry.value()))
                .ok_or_else(|| invalid(format!("unknown concept '{}'", target.concept())))?;
            if !concept.actions().iter().any(|a| *a == target.action()) {
                return Err(invalid(format!("unknown action '{}'", target)));
            }
        }
        Ok(())
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn validate_concept(concept: &dyn Concept) -> Result<(), EngineError> {
    let invalid = |reason: String| EngineError::InvalidConcept {
        concept: concept.name().to_string(),
        reason,
    };
    if concept.name().trim().is_empty() {
        return Err(invalid("name is empty".into()));
    }
    if let Some(action) = concept.actions().iter().find(|a| a.starts_with('_')) {
        return Err(invalid(format!("action '{}' must not start with '_'", action)));
    }
    if let Some(query) = concept.queries().iter().find(|q| !q.starts_with('_')) {
        return Err(invalid(format!("query '{}' must start with '_'", query)));
    }
    Ok(())
}
