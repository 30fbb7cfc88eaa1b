//! Correlates a new invocation with its flow's history against `when` clauses.

use std::sync::Arc;

use crate::domain::foundation::InvocationId;
use crate::domain::sync::{ActionPattern, Frame, Frames, InvocationRecord};

/// Finds every frame under which all `when` patterns are satisfied by
/// distinct records of the flow, with `trigger` filling at least one position.
pub(crate) fn match_when(
    when: &[ActionPattern],
    trigger: &InvocationRecord,
    history: &[Arc<InvocationRecord>],
) -> Frames {
    let mut found = Vec::new();
    for (position, pattern) in when.iter().enumerate() {
        let Some(seed) = pattern.match_record(trigger, &Frame::new()) else {
            continue;
        };
        let mut join = Join {
            when,
            seeded: position,
            history,
            used: vec![trigger.id],
            found: &mut found,
        };
        join.extend(0, seed);
    }
    Frames::from(found)
}

struct Join<'a> {
    when: &'a [ActionPattern],
    seeded: usize,
    history: &'a [Arc<InvocationRecord>],
    used: Vec<InvocationId>,
    found: &'a mut Vec<Frame>,
}

impl Join<'_> {
    fn extend(&mut self, position: usize, frame: Frame) {
        if position == self.when.len() {
            if !self.found.contains(&frame) {
                self.found.push(frame);
            }
            return;
        }
        if position == self.seeded {
            self.extend(position + 1, frame);
            return;
        }
        let (when, history) = (self.when, self.history);
        let pattern = &when[position];
        for record in history {
            if self.used.contains(&record.id) {
                continue;
            }
            if let Some(next) = pattern.match_record(record, &frame) {
                self.used.push(record.id);
                self.extend(position + 1, next);
                self.used.pop();
            }
        }
    }
}
