//! Instrumented concept handles.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::domain::sync::{ActionRef, Fields, Frames, PatternObject};
use crate::ports::Concept;

use super::dispatch::{execute, invoke, synchronize, Invocation};
use super::sync_engine::EngineInner;
use super::error::EngineError;

/// A concept wired into an engine.
///
/// Actions performed through the handle are recorded and synchronized;
/// queries pass straight through.
#[derive(Clone)]
pub struct ConceptHandle {
    name: Arc<str>,
    concept: Arc<dyn Concept>,
    inner: Arc<EngineInner>,
}

impl ConceptHandle {
    pub(crate) fn new(concept: Arc<dyn Concept>, inner: Arc<EngineInner>) -> Self {
        Self {
            name: Arc::from(concept.name()),
            concept,
            inner,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reference to one of this concept's actions, for `when`/`then` lists.
    pub fn action(&self, action: &str) -> ActionRef {
        ActionRef::new(&self.name, action)
    }

    /// Reference to one of this concept's queries, for where-clauses.
    pub fn query_ref(&self, query: &str) -> QueryRef {
        QueryRef {
            concept: Arc::clone(&self.concept),
            name: Arc::from(query),
        }
    }

    /// Performs `action` as the root of a new flow and waits for the whole
    /// cascade it triggers.
    pub async fn perform(&self, action: &str, input: Fields) -> Result<Fields, EngineError> {
        let invocation = Invocation::root(&self.name, action, input);
        let record = invoke(Arc::clone(&self.inner), invocation).await?;
        Ok(record.output.clone())
    }

    /// Performs `action` as the root of a new flow and returns its output
    /// as soon as the action settles. The cascade continues on a spawned task.
    pub async fn perform_detached(&self, action: &str, input: Fields) -> Result<Fields, EngineError> {
        let invocation = Invocation::root(&self.name, action, input);
        let (record, guard) = execute(&self.inner, invocation).await?;
        let output = record.output.clone();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            synchronize(inner, record).await;
            drop(guard);
        });
        Ok(output)
    }

    /// Runs a query. Queries are never recorded.
    pub async fn query(&self, query: &str, input: Fields) -> Vec<Fields> {
        self.concept.query(query, input).await
    }
}

impl fmt::Debug for ConceptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConceptHandle")
            .field("name", &self.name)
            .finish()
    }
}

/// A concept query usable from where-clauses.
#[derive(Clone)]
pub struct QueryRef {
    concept: Arc<dyn Concept>,
    name: Arc<str>,
}

impl QueryRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the query. The returned future owns everything it needs.
    pub fn call(&self, input: Fields) -> BoxFuture<'static, Vec<Fields>> {
        let concept = Arc::clone(&self.concept);
        let name = Arc::clone(&self.name);
        async move { concept.query(&name, input).await }.boxed()
    }

    /// Joins `frames` with this query; see [`Frames::query`].
    pub async fn join(&self, frames: Frames, input: &PatternObject, output: &PatternObject) -> Frames {
        frames.query(|row| self.call(row), input, output).await
    }
}

impl fmt::Debug for QueryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueryRef({}.{})", self.concept.name(), self.name)
    }
}
