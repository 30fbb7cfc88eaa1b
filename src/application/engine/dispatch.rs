//! Invocation, synchronization and then-clause dispatch.
//!
//! Cascades recurse through boxed futures: an invocation synchronizes, each
//! matched synchronization dispatches further invocations, and those
//! synchronize in turn until no rule matches or `max_depth` is reached.

use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;

use crate::domain::foundation::{FlowId, InvocationId, Timestamp};
use crate::domain::sync::{Fields, Frame, Frames, InvocationRecord, Synchronization};

use super::sync_engine::EngineInner;
use super::error::EngineError;
use super::flow::FlowGuard;
use super::matcher::match_when;

/// An action call about to be made on behalf of a caller or a synchronization.
pub(crate) struct Invocation {
    pub concept: String,
    pub action: String,
    pub input: Fields,
    pub flow: FlowId,
    pub depth: u32,
    pub cause: Option<InvocationId>,
    pub sync: Option<String>,
}

impl Invocation {
    pub(crate) fn root(concept: &str, action: &str, input: Fields) -> Self {
        Self {
            concept: concept.to_string(),
            action: action.to_string(),
            input,
            flow: FlowId::new(),
            depth: 0,
            cause: None,
            sync: None,
        }
    }
}

/// Calls the action and builds its record, without synchronizing.
///
/// The returned guard keeps the flow alive. Hold it until [`synchronize`]
/// for this record has finished.
pub(crate) async fn execute(
    inner: &Arc<EngineInner>,
    invocation: Invocation,
) -> Result<(Arc<InvocationRecord>, FlowGuard), EngineError> {
    let concept = inner
        .concepts
        .get(&invocation.concept)
        .map(|entry| Arc::clone(entry.value()))
        .ok_or_else(|| EngineError::UnknownConcept(invocation.concept.clone()))?;

    if !concept.actions().iter().any(|a| *a == invocation.action) {
        return Err(EngineError::UnknownAction {
            concept: invocation.concept,
            action: invocation.action,
        });
    }
    if invocation.depth > inner.config.max_depth {
        return Err(EngineError::DepthExceeded {
            action: format!("{}.{}", invocation.concept, invocation.action),
            depth: invocation.depth,
            limit: inner.config.max_depth,
        });
    }

    let guard = inner.flows.enter(invocation.flow);
    let output = concept
        .perform(&invocation.action, invocation.input.clone())
        .await;

    let record = Arc::new(InvocationRecord {
        id: InvocationId::new(),
        concept: invocation.concept,
        action: invocation.action,
        input: invocation.input,
        output,
        flow: invocation.flow,
        depth: invocation.depth,
        cause: invocation.cause,
        sync: invocation.sync,
        timestamp: Timestamp::now(),
    });

    tracing::debug!(
        concept = %record.concept,
        action = %record.action,
        flow = %record.flow,
        depth = record.depth,
        sync = record.sync.as_deref().unwrap_or("-"),
        error = record.is_error(),
        "Action completed"
    );

    Ok((record, guard))
}

/// Calls the action, then runs the full cascade it triggers.
pub(crate) fn invoke(
    inner: Arc<EngineInner>,
    invocation: Invocation,
) -> BoxFuture<'static, Result<Arc<InvocationRecord>, EngineError>> {
    async move {
        let (record, guard) = execute(&inner, invocation).await?;
        synchronize(inner, Arc::clone(&record)).await;
        drop(guard);
        Ok(record)
    }
    .boxed()
}

/// Feeds `record` to every interested synchronization concurrently.
pub(crate) fn synchronize(inner: Arc<EngineInner>, record: Arc<InvocationRecord>) -> BoxFuture<'static, ()> {
    async move {
        let history = inner.flows.record(Arc::clone(&record));
        let interested = inner.registry.interested(&record.action_ref());
        if interested.is_empty() {
            return;
        }
        let history = Arc::new(history);
        let runs = interested.into_iter().map(|sync| {
            run_sync(
                Arc::clone(&inner),
                sync,
                Arc::clone(&record),
                Arc::clone(&history),
            )
        });
        join_all(runs).await;
    }
    .boxed()
}

async fn run_sync(
    inner: Arc<EngineInner>,
    sync: Arc<Synchronization>,
    trigger: Arc<InvocationRecord>,
    history: Arc<Vec<Arc<InvocationRecord>>>,
) {
    let matched: Frames = match_when(&sync.when, &trigger, &history)
        .into_iter()
        .filter(|frame| inner.flows.try_fire(trigger.flow, &sync.name, frame))
        .collect();
    if matched.is_empty() {
        return;
    }

    tracing::debug!(
        sync = %sync.name,
        flow = %trigger.flow,
        frames = matched.len(),
        "Synchronization matched"
    );

    let frames = match &sync.where_clause {
        Some(clause) => match clause.apply(matched).await {
            Ok(frames) => frames,
            Err(err) => {
                tracing::warn!(
                    sync = %sync.name,
                    flow = %trigger.flow,
                    error = %err,
                    "Where clause failed; synchronization aborted"
                );
                return;
            }
        },
        None => matched,
    };

    let dispatches = frames.into_iter().map(|frame| {
        dispatch_frame(
            Arc::clone(&inner),
            Arc::clone(&sync),
            Arc::clone(&trigger),
            frame,
        )
    });
    join_all(dispatches).await;
}

async fn dispatch_frame(
    inner: Arc<EngineInner>,
    sync: Arc<Synchronization>,
    cause: Arc<InvocationRecord>,
    frame: Frame,
) {
    for pattern in &sync.then {
        let input = match pattern.input.resolve(&frame) {
            Ok(input) => input,
            Err(unbound) => {
                tracing::debug!(
                    sync = %sync.name,
                    target = %pattern.target,
                    variable = %unbound.var,
                    "Skipping then action with unbound variable"
                );
                continue;
            }
        };
        let invocation = Invocation {
            concept: pattern.target.concept().to_string(),
            action: pattern.target.action().to_string(),
            input,
            flow: cause.flow,
            depth: cause.depth + 1,
            cause: Some(cause.id),
            sync: Some(sync.name.clone()),
        };
        if let Err(err) = invoke(Arc::clone(&inner), invocation).await {
            tracing::warn!(
                sync = %sync.name,
                flow = %cause.flow,
                error = %err,
                "Then dispatch stopped"
            );
            break;
        }
    }
}
