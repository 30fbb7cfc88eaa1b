//! Declarative patterns over action invocations.
//!
//! A pattern object is a subset match on the top-level fields of an input or
//! output: every declared key must be present, literals compare by equality
//! and variables either bind or must agree with the frame.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use super::fields::Fields;
use super::frame::Frame;
use super::invocation::InvocationRecord;
use super::vars::Var;

/// A variable that had no binding when a pattern was resolved.
#[derive(Debug, Clone, Error)]
#[error("variable {var} is not bound")]
pub struct UnboundVariable {
    pub var: Var,
}

/// One field of a pattern: a fixed value or a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternField {
    Literal(Value),
    Variable(Var),
}

impl PatternField {
    pub fn as_var(&self) -> Option<&Var> {
        match self {
            PatternField::Variable(var) => Some(var),
            PatternField::Literal(_) => None,
        }
    }

    /// Matches `actual`, extending `frame` when this field is a variable.
    pub fn unify(&self, actual: &Value, frame: &mut Frame) -> bool {
        match self {
            PatternField::Literal(expected) => expected == actual,
            PatternField::Variable(var) => frame.unify(var, actual),
        }
    }

    /// Produces the concrete value for this field under `frame`.
    pub fn resolve(&self, frame: &Frame) -> Result<Value, UnboundVariable> {
        match self {
            PatternField::Literal(value) => Ok(value.clone()),
            PatternField::Variable(var) => frame
                .get(var)
                .cloned()
                .ok_or_else(|| UnboundVariable { var: var.clone() }),
        }
    }
}

impl From<Var> for PatternField {
    fn from(var: Var) -> Self {
        PatternField::Variable(var)
    }
}

impl From<&Var> for PatternField {
    fn from(var: &Var) -> Self {
        PatternField::Variable(var.clone())
    }
}

impl From<Value> for PatternField {
    fn from(value: Value) -> Self {
        PatternField::Literal(value)
    }
}

impl From<&str> for PatternField {
    fn from(value: &str) -> Self {
        PatternField::Literal(Value::from(value))
    }
}

impl From<String> for PatternField {
    fn from(value: String) -> Self {
        PatternField::Literal(Value::from(value))
    }
}

impl From<i32> for PatternField {
    fn from(value: i32) -> Self {
        PatternField::Literal(Value::from(value))
    }
}

impl From<i64> for PatternField {
    fn from(value: i64) -> Self {
        PatternField::Literal(Value::from(value))
    }
}

impl From<u16> for PatternField {
    fn from(value: u16) -> Self {
        PatternField::Literal(Value::from(value))
    }
}

impl From<bool> for PatternField {
    fn from(value: bool) -> Self {
        PatternField::Literal(Value::from(value))
    }
}

/// Ordered set of `key => field` entries. Built with the [`fields!`](crate::fields) macro.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternObject {
    entries: Vec<(String, PatternField)>,
}

impl PatternObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for `key`.
    pub fn insert(&mut self, key: impl Into<String>, field: impl Into<PatternField>) {
        let key = key.into();
        let field = field.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = field,
            None => self.entries.push((key, field)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, field: impl Into<PatternField>) -> Self {
        self.insert(key, field);
        self
    }

    pub fn get(&self, key: &str) -> Option<&PatternField> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, f)| f)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PatternField)> {
        self.entries.iter().map(|(k, f)| (k.as_str(), f))
    }

    /// Variables referenced by this pattern, in declaration order.
    pub fn vars(&self) -> impl Iterator<Item = &Var> {
        self.entries.iter().filter_map(|(_, f)| f.as_var())
    }

    /// Subset-matches `actual`, returning the extended frame on success.
    pub fn unify(&self, actual: &Fields, frame: &Frame) -> Option<Frame> {
        let mut next = frame.clone();
        for (key, field) in &self.entries {
            let value = actual.get(key)?;
            if !field.unify(value, &mut next) {
                return None;
            }
        }
        Some(next)
    }

    /// Substitutes bound variables, failing on the first unbound one.
    pub fn resolve(&self, frame: &Frame) -> Result<Fields, UnboundVariable> {
        self.entries
            .iter()
            .map(|(key, field)| Ok((key.clone(), field.resolve(frame)?)))
            .collect()
    }
}

/// Builds a [`PatternObject`] from `key => value_or_var` pairs.
///
/// ```ignore
/// let pattern = fields! { "method" => "POST", "name" => &name };
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::domain::sync::PatternObject::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut pattern = $crate::domain::sync::PatternObject::new();
        $( pattern.insert($key, $value); )+
        pattern
    }};
}

/// Reference to one action of one concept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionRef {
    concept: Arc<str>,
    action: Arc<str>,
}

impl ActionRef {
    pub fn new(concept: &str, action: &str) -> Self {
        Self {
            concept: Arc::from(concept),
            action: Arc::from(action),
        }
    }

    pub fn concept(&self) -> &str {
        &self.concept
    }

    pub fn action(&self) -> &str {
        &self.action
    }
}

impl fmt::Display for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.concept, self.action)
    }
}

/// A `when` or `then` entry: target action plus input/output patterns.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionPattern {
    pub target: ActionRef,
    pub input: PatternObject,
    pub output: Option<PatternObject>,
    pub flow: Option<PatternField>,
}

impl ActionPattern {
    pub fn new(target: ActionRef, input: PatternObject) -> Self {
        Self {
            target,
            input,
            output: None,
            flow: None,
        }
    }

    pub fn with_output(mut self, output: PatternObject) -> Self {
        self.output = Some(output);
        self
    }

    /// Binds or asserts the flow token of the matched invocation.
    pub fn with_flow(mut self, flow: impl Into<PatternField>) -> Self {
        self.flow = Some(flow.into());
        self
    }

    /// Matches `record` under `frame`, returning the extended frame.
    pub fn match_record(&self, record: &InvocationRecord, frame: &Frame) -> Option<Frame> {
        if record.concept != self.target.concept() || record.action != self.target.action() {
            return None;
        }
        let frame = self.input.unify(&record.input, frame)?;
        let mut frame = match &self.output {
            Some(output) => output.unify(&record.output, &frame)?,
            None => frame,
        };
        if let Some(flow) = &self.flow {
            let token = Value::String(record.flow.to_string());
            if !flow.unify(&token, &mut frame) {
                return None;
            }
        }
        Some(frame)
    }

    /// Every variable the pattern references.
    pub fn vars(&self) -> impl Iterator<Item = &Var> {
        self.input
            .vars()
            .chain(self.output.iter().flat_map(|o| o.vars()))
            .chain(self.flow.iter().filter_map(|f| f.as_var()))
    }
}

impl From<(ActionRef, PatternObject)> for ActionPattern {
    fn from((target, input): (ActionRef, PatternObject)) -> Self {
        ActionPattern::new(target, input)
    }
}

impl From<(&ActionRef, PatternObject)> for ActionPattern {
    fn from((target, input): (&ActionRef, PatternObject)) -> Self {
        ActionPattern::new(target.clone(), input)
    }
}

impl From<(ActionRef, PatternObject, PatternObject)> for ActionPattern {
    fn from((target, input, output): (ActionRef, PatternObject, PatternObject)) -> Self {
        ActionPattern::new(target, input).with_output(output)
    }
}

impl From<(&ActionRef, PatternObject, PatternObject)> for ActionPattern {
    fn from((target, input, output): (&ActionRef, PatternObject, PatternObject)) -> Self {
        ActionPattern::new(target.clone(), input).with_output(output)
    }
}

/// Builds a `Vec<ActionPattern>` from `(action, input)` and
/// `(action, input, output)` tuples.
#[macro_export]
macro_rules! actions {
    ($($entry:expr),* $(,)?) => {
        vec![$($crate::domain::sync::ActionPattern::from($entry)),*]
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::FlowId;
    use crate::domain::sync::{fields_of, Vars};
    use crate::{actions, fields};
    use serde_json::json;

    fn record(concept: &str, action: &str, input: Value, output: Value) -> InvocationRecord {
        InvocationRecord::root(
            concept,
            action,
            fields_of(input),
            fields_of(output),
            FlowId::new(),
        )
    }

    #[test]
    fn literal_fields_match_by_equality_only() {
        let pattern = fields! { "method" => "POST" };
        let frame = Frame::new();

        assert!(pattern.unify(&fields_of(json!({"method": "POST"})), &frame).is_some());
        assert!(pattern.unify(&fields_of(json!({"method": "GET"})), &frame).is_none());
        assert!(pattern.unify(&fields_of(json!({})), &frame).is_none());
    }

    #[test]
    fn variables_bind_then_must_agree() {
        let mut vars = Vars::new();
        let x = vars.var("x");
        let pattern = fields! { "a" => &x, "b" => &x };

        let same = pattern.unify(&fields_of(json!({"a": 1, "b": 1})), &Frame::new());
        let differ = pattern.unify(&fields_of(json!({"a": 1, "b": 2})), &Frame::new());

        assert_eq!(same.and_then(|f| f.get(&x).cloned()), Some(json!(1)));
        assert!(differ.is_none());
    }

    #[test]
    fn extra_actual_fields_are_ignored() {
        let pattern = fields! { "path" => "/api/teams" };
        let actual = fields_of(json!({"path": "/api/teams", "method": "POST", "name": "X"}));
        assert!(pattern.unify(&actual, &Frame::new()).is_some());
    }

    #[test]
    fn resolve_reports_unbound_variable() {
        let mut vars = Vars::new();
        let missing = vars.var("missing");
        let pattern = fields! { "status" => 201, "body" => &missing };

        let err = pattern.resolve(&Frame::new()).unwrap_err();
        assert_eq!(err.var, missing);
    }

    #[test]
    fn insert_replaces_existing_key() {
        let pattern = fields! { "k" => 1, "k" => 2 };
        assert_eq!(pattern.len(), 1);
        assert_eq!(pattern.get("k"), Some(&PatternField::Literal(json!(2))));
    }

    #[test]
    fn action_pattern_checks_target_input_and_output() {
        let mut vars = Vars::new();
        let team = vars.var("team");
        let create = ActionRef::new("Team", "create");
        let pattern: ActionPattern = (&create, fields! {}, fields! { "team" => &team }).into();

        let ok = record("Team", "create", json!({"name": "X"}), json!({"team": {"id": "t"}}));
        let failed = record("Team", "create", json!({}), json!({"error": "boom"}));
        let other = record("Team", "delete", json!({}), json!({"team": {}}));

        assert!(pattern.match_record(&ok, &Frame::new()).is_some());
        assert!(pattern.match_record(&failed, &Frame::new()).is_none());
        assert!(pattern.match_record(&other, &Frame::new()).is_none());
    }

    #[test]
    fn flow_field_binds_flow_token() {
        let mut vars = Vars::new();
        let flow = vars.var("flow");
        let pattern = ActionPattern::new(ActionRef::new("API", "request"), fields! {}).with_flow(&flow);
        let rec = record("API", "request", json!({}), json!({"request": "r"}));

        let frame = pattern.match_record(&rec, &Frame::new());
        assert_eq!(
            frame.and_then(|f| f.get_str(&flow).map(str::to_string)),
            Some(rec.flow.to_string())
        );
    }

    #[test]
    fn actions_macro_accepts_both_tuple_shapes() {
        let request = ActionRef::new("API", "request");
        let respond = ActionRef::new("API", "respond");
        let list = actions![
            (&request, fields! { "method" => "GET" }),
            (respond, fields! {}, fields! { "request" => "r" }),
        ];

        assert_eq!(list.len(), 2);
        assert!(list[0].output.is_none());
        assert!(list[1].output.is_some());
    }
}
