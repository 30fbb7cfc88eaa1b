//! Synchronization declarations and their where-clauses.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::domain::foundation::DomainError;

use super::frame::Frames;
use super::pattern::{ActionPattern, ActionRef};
use super::vars::Vars;

type WhereFn = dyn Fn(Frames) -> BoxFuture<'static, Result<Frames, DomainError>> + Send + Sync;

/// Frame transform run between matching and dispatch.
#[derive(Clone)]
pub struct WhereClause(Arc<WhereFn>);

impl WhereClause {
    /// Wraps a synchronous transform.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(Frames) -> Result<Frames, DomainError> + Send + Sync + 'static,
    {
        Self(Arc::new(move |frames| {
            let result = f(frames);
            async move { result }.boxed()
        }))
    }

    /// Wraps an asynchronous transform.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Frames) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Frames, DomainError>> + Send + 'static,
    {
        Self(Arc::new(move |frames| f(frames).boxed()))
    }

    pub async fn apply(&self, frames: Frames) -> Result<Frames, DomainError> {
        (self.0)(frames).await
    }
}

impl fmt::Debug for WhereClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WhereClause(..)")
    }
}

/// What a synchronization factory returns.
///
/// ```ignore
/// SyncDeclaration::when(actions![(request, fields! { "path" => "/api/teams" })])
///     .where_async(move |frames| async move { Ok(frames) })
///     .then(actions![(create, fields! { "name" => &name })])
/// ```
#[derive(Debug, Clone)]
pub struct SyncDeclaration {
    pub when: Vec<ActionPattern>,
    pub where_clause: Option<WhereClause>,
    pub then: Vec<ActionPattern>,
}

impl SyncDeclaration {
    pub fn when(patterns: Vec<ActionPattern>) -> Self {
        Self {
            when: patterns,
            where_clause: None,
            then: Vec::new(),
        }
    }

    pub fn where_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(Frames) -> Result<Frames, DomainError> + Send + Sync + 'static,
    {
        self.where_clause = Some(WhereClause::from_fn(f));
        self
    }

    pub fn where_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Frames) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Frames, DomainError>> + Send + 'static,
    {
        self.where_clause = Some(WhereClause::from_async(f));
        self
    }

    pub fn then(mut self, patterns: Vec<ActionPattern>) -> Self {
        self.then = patterns;
        self
    }
}

/// Factory invoked once at registration with a fresh variable allocator.
pub type SyncFactory = Box<dyn FnOnce(&mut Vars) -> SyncDeclaration + Send>;

/// Boxes a closure as a [`SyncFactory`].
pub fn sync<F>(factory: F) -> SyncFactory
where
    F: FnOnce(&mut Vars) -> SyncDeclaration + Send + 'static,
{
    Box::new(factory)
}

/// A registered, named synchronization.
#[derive(Debug, Clone)]
pub struct Synchronization {
    pub name: String,
    pub when: Vec<ActionPattern>,
    pub where_clause: Option<WhereClause>,
    pub then: Vec<ActionPattern>,
}

impl Synchronization {
    pub fn new(name: impl Into<String>, declaration: SyncDeclaration) -> Self {
        Self {
            name: name.into(),
            when: declaration.when,
            where_clause: declaration.where_clause,
            then: declaration.then,
        }
    }

    /// Distinct actions this synchronization listens to.
    pub fn observed(&self) -> BTreeSet<ActionRef> {
        self.when.iter().map(|p| p.target.clone()).collect()
    }

    /// Every action referenced by `when` or `then`.
    pub fn referenced(&self) -> impl Iterator<Item = &ActionRef> {
        self.when.iter().chain(self.then.iter()).map(|p| &p.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sync::Frame;
    use crate::{actions, fields};

    fn declaration(vars: &mut Vars) -> SyncDeclaration {
        let name = vars.var("name");
        let request = ActionRef::new("API", "request");
        let create = ActionRef::new("Team", "create");
        SyncDeclaration::when(actions![
            (&request, fields! { "name" => &name }),
            (&request, fields! { "method" => "POST" }),
        ])
        .then(actions![(create, fields! { "name" => &name })])
    }

    #[test]
    fn observed_deduplicates_when_targets() {
        let sync = Synchronization::new("CreateTeam", declaration(&mut Vars::new()));
        assert_eq!(sync.observed().len(), 1);
        assert_eq!(sync.referenced().count(), 3);
    }

    #[tokio::test]
    async fn sync_where_clause_filters() {
        let clause = WhereClause::from_fn(|frames: Frames| Ok(frames.filter(|f| !f.is_empty())));
        let out = clause
            .apply(vec![Frame::new(), Frame::new()].into())
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn async_where_clause_can_fail() {
        let clause = WhereClause::from_async(|_frames: Frames| async {
            Err(DomainError::forbidden("not a member"))
        });
        assert!(clause.apply(Frames::new()).await.is_err());
    }

    #[test]
    fn factory_runs_with_given_allocator() {
        let factory = sync(declaration);
        let mut vars = Vars::new();
        let decl = factory(&mut vars);
        assert!(vars.get("name").is_some());
        assert_eq!(decl.when.len(), 2);
    }
}
