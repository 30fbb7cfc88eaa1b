//! Named synchronizations indexed by the actions they observe.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::sync::{ActionRef, Synchronization};

use super::error::EngineError;

#[derive(Default)]
pub(crate) struct SyncRegistry {
    syncs: DashMap<String, Arc<Synchronization>>,
    index: DashMap<ActionRef, Vec<Arc<Synchronization>>>,
}

impl SyncRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.syncs.contains_key(name)
    }

    pub(crate) fn insert(&self, sync: Synchronization) -> Result<(), EngineError> {
        let sync = Arc::new(sync);
        match self.syncs.entry(sync.name.clone()) {
            Entry::Occupied(_) => return Err(EngineError::DuplicateSync(sync.name.clone())),
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&sync));
            }
        }
        for action in sync.observed() {
            self.index.entry(action).or_default().push(Arc::clone(&sync));
        }
        Ok(())
    }

    pub(crate) fn remove(&self, name: &str) -> Option<Arc<Synchronization>> {
        let (_, sync) = self.syncs.remove(name)?;
        for action in sync.observed() {
            if let Some(mut listeners) = self.index.get_mut(&action) {
                listeners.retain(|s| s.name != name);
            }
            self.index.remove_if(&action, |_, listeners| listeners.is_empty());
        }
        Some(sync)
    }

    /// Synchronizations whose `when` mentions `action`.
    pub(crate) fn interested(&self, action: &ActionRef) -> Vec<Arc<Synchronization>> {
        self.index
            .get(action)
            .map(|listeners| listeners.clone())
            .unwrap_or_default()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.syncs.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub(crate) fn len(&self) -> usize {
        self.syncs.len()
    }
}
