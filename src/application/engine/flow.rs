//! Per-flow invocation history and the fire-once guard.
//!
//! A flow is created by its first invocation and retired when its last
//! in-progress invocation (including the cascade it triggered) completes.
//! Flows touched without a guard are left idle and removed by
//! [`FlowTable::sweep`] once the TTL passes; a flow with an invocation still
//! in progress is never swept.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::domain::foundation::FlowId;
use crate::domain::sync::{Frame, InvocationRecord};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FiredKey {
    sync: String,
    bindings: [u8; 32],
}

impl FiredKey {
    fn new(sync: &str, frame: &Frame) -> Self {
        let digest = Sha256::digest(frame.canonical_bytes());
        Self {
            sync: sync.to_string(),
            bindings: digest.into(),
        }
    }
}

struct FlowState {
    records: Vec<Arc<InvocationRecord>>,
    fired: HashSet<FiredKey>,
    active: usize,
    last_touched: Instant,
}

impl FlowState {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            fired: HashSet::new(),
            active: 0,
            last_touched: Instant::now(),
        }
    }
}

pub(crate) struct FlowTable {
    flows: DashMap<FlowId, FlowState>,
    ttl: Duration,
}

impl FlowTable {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            flows: DashMap::new(),
            ttl,
        }
    }

    /// Marks one more invocation as in progress in `flow`.
    pub(crate) fn enter(self: &Arc<Self>, flow: FlowId) -> FlowGuard {
        let mut state = self.flows.entry(flow).or_insert_with(FlowState::new);
        state.active += 1;
        state.last_touched = Instant::now();
        FlowGuard {
            table: Arc::clone(self),
            flow,
        }
    }

    /// Appends `record` to its flow and returns the history including it.
    pub(crate) fn record(&self, record: Arc<InvocationRecord>) -> Vec<Arc<InvocationRecord>> {
        let mut state = self.flows.entry(record.flow).or_insert_with(FlowState::new);
        state.records.push(record);
        state.last_touched = Instant::now();
        state.records.clone()
    }

    /// Claims the right to fire `sync` for `frame` in `flow`.
    ///
    /// Returns false when the same synchronization already fired with the
    /// same bindings in this flow.
    pub(crate) fn try_fire(&self, flow: FlowId, sync: &str, frame: &Frame) -> bool {
        let mut state = self.flows.entry(flow).or_insert_with(FlowState::new);
        state.last_touched = Instant::now();
        state.fired.insert(FiredKey::new(sync, frame))
    }

    /// Removes flows with nothing in progress that have been idle for
    /// longer than the configured TTL.
    pub(crate) fn sweep(&self) -> usize {
        let before = self.flows.len();
        let ttl = self.ttl;
        self.flows
            .retain(|_, state| state.active > 0 || state.last_touched.elapsed() < ttl);
        before.saturating_sub(self.flows.len())
    }

    pub(crate) fn len(&self) -> usize {
        self.flows.len()
    }

    pub(crate) fn ttl(&self) -> Duration {
        self.ttl
    }

    fn leave(&self, flow: &FlowId) {
        if let Some(mut state) = self.flows.get_mut(flow) {
            state.active = state.active.saturating_sub(1);
        }
        if self.flows.remove_if(flow, |_, state| state.active == 0).is_some() {
            tracing::trace!(flow = %flow, "Flow retired");
        }
    }
}

/// Keeps a flow alive while an invocation and its cascade are in progress.
pub(crate) struct FlowGuard {
    table: Arc<FlowTable>,
    flow: FlowId,
}

impl Drop for FlowGuard {
    fn drop(&mut self) {
        self.table.leave(&self.flow);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sync::{Fields, Vars};

    fn record_in(flow: FlowId) -> Arc<InvocationRecord> {
        Arc::new(InvocationRecord::root(
            "Team",
            "create",
            Fields::new(),
            Fields::new(),
            flow,
        ))
    }

    #[test]
    fn flow_retires_when_last_guard_drops() {
        let table = Arc::new(FlowTable::new(Duration::from_secs(60)));
        let flow = FlowId::new();

        let outer = table.enter(flow);
        let inner = table.enter(flow);
        assert_eq!(table.record(record_in(flow)).len(), 1);

        drop(inner);
        assert_eq!(table.len(), 1);
        drop(outer);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn history_accumulates_within_flow() {
        let table = Arc::new(FlowTable::new(Duration::from_secs(60)));
        let flow = FlowId::new();
        let _guard = table.enter(flow);

        table.record(record_in(flow));
        let history = table.record(record_in(flow));
        assert_eq!(history.len(), 2);

        let other = FlowId::new();
        let _other_guard = table.enter(other);
        assert_eq!(table.record(record_in(other)).len(), 1);
    }

    #[test]
    fn try_fire_is_once_per_sync_and_bindings() {
        let table = Arc::new(FlowTable::new(Duration::from_secs(60)));
        let flow = FlowId::new();
        let _guard = table.enter(flow);

        let mut vars = Vars::new();
        let x = vars.var("x");
        let one = Frame::new().with(&x, 1);
        let two = Frame::new().with(&x, 2);

        assert!(table.try_fire(flow, "S", &one));
        assert!(!table.try_fire(flow, "S", &one));
        assert!(table.try_fire(flow, "S", &two));
        assert!(table.try_fire(flow, "T", &one));
        assert!(table.try_fire(FlowId::new(), "S", &one));
    }

    #[test]
    fn sweep_removes_idle_flows_only() {
        let table = Arc::new(FlowTable::new(Duration::from_millis(0)));
        let running = FlowId::new();
        let guard = table.enter(running);
        table.record(record_in(running));
        let idle = FlowId::new();
        table.record(record_in(idle));

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(table.sweep(), 1);
        assert_eq!(table.len(), 1);

        // the in-progress flow keeps its history and fired keys
        assert_eq!(table.record(record_in(running)).len(), 2);

        drop(guard);
        assert_eq!(table.len(), 0);
    }
}
