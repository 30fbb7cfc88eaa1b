//! Variable-binding environments and the frame set combinators used by
//! where-clauses.

use std::collections::BTreeMap;
use std::future::Future;

use serde_json::Value;

use super::fields::Fields;
use super::pattern::PatternObject;
use super::vars::Var;

/// One consistent assignment of values to variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    bindings: BTreeMap<Var, Value>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, var: &Var) -> Option<&Value> {
        self.bindings.get(var)
    }

    /// Returns the binding as a string slice if it is a JSON string.
    pub fn get_str(&self, var: &Var) -> Option<&str> {
        self.get(var).and_then(Value::as_str)
    }

    /// Binds `var` to `value`, or checks agreement with an existing binding.
    ///
    /// Returns false when `var` is already bound to a different value; the
    /// frame is left unchanged in that case.
    pub fn unify(&mut self, var: &Var, value: &Value) -> bool {
        match self.bindings.get(var) {
            Some(existing) => existing == value,
            None => {
                self.bindings.insert(var.clone(), value.clone());
                true
            }
        }
    }

    /// Sets `var`, replacing any previous binding.
    pub fn set(&mut self, var: &Var, value: impl Into<Value>) {
        self.bindings.insert(var.clone(), value.into());
    }

    /// Builder form of [`Frame::set`].
    pub fn with(mut self, var: &Var, value: impl Into<Value>) -> Self {
        self.set(var, value);
        self
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Var, &Value)> {
        self.bindings.iter()
    }

    /// Canonical serialization of the bindings, ordered by variable token.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let pairs: Vec<(u64, &Value)> = self
            .bindings
            .iter()
            .map(|(var, value)| (var.token(), value))
            .collect();
        serde_json::to_vec(&pairs).unwrap_or_default()
    }
}

/// Ordered collection of frames flowing through a where-clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frames(Vec<Frame>);

impl Frames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(frame: Frame) -> Self {
        Self(vec![frame])
    }

    pub fn push(&mut self, frame: Frame) {
        self.0.push(frame);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<Frame> {
        self.0
    }

    /// Transforms every frame.
    pub fn map<F>(self, f: F) -> Self
    where
        F: FnMut(Frame) -> Frame,
    {
        Self(self.0.into_iter().map(f).collect())
    }

    /// Keeps the frames for which `predicate` holds.
    pub fn filter<F>(self, mut predicate: F) -> Self
    where
        F: FnMut(&Frame) -> bool,
    {
        Self(self.0.into_iter().filter(|frame| predicate(frame)).collect())
    }

    /// Joins every frame with the rows returned by `query_fn`.
    ///
    /// For each frame the input pattern is resolved against its bindings and
    /// the query is called once. Each returned row that unifies with
    /// `output` yields one extended frame, so a frame with zero matching rows
    /// disappears and a frame with `n` rows becomes `n` frames. Frames whose
    /// input cannot be resolved are dropped without calling the query.
    pub async fn query<F, Fut>(self, query_fn: F, input: &PatternObject, output: &PatternObject) -> Self
    where
        F: Fn(Fields) -> Fut,
        Fut: Future<Output = Vec<Fields>>,
    {
        let mut joined = Vec::new();
        for frame in self.0 {
            let Ok(resolved) = input.resolve(&frame) else {
                continue;
            };
            for row in query_fn(resolved).await {
                if let Some(extended) = output.unify(&row, &frame) {
                    joined.push(extended);
                }
            }
        }
        Self(joined)
    }

    /// Groups frames by every binding not in `keep` and binds `into` to the
    /// array of `{name: value}` objects built from the `keep` variables.
    ///
    /// Groups keep the order in which their first frame appeared.
    pub fn collect_as(self, keep: &[Var], into: &Var) -> Self {
        let mut groups: Vec<(Frame, Vec<Value>)> = Vec::new();
        for frame in self.0 {
            let mut key = Frame::new();
            let mut item = Fields::new();
            for (var, value) in frame.iter() {
                if keep.contains(var) {
                    item.insert(var.name().to_string(), value.clone());
                } else if var != into {
                    key.set(var, value.clone());
                }
            }
            match groups.iter_mut().find(|(existing, _)| *existing == key) {
                Some((_, items)) => items.push(Value::Object(item)),
                None => groups.push((key, vec![Value::Object(item)])),
            }
        }
        Self(
            groups
                .into_iter()
                .map(|(key, items)| key.with(into, Value::Array(items)))
                .collect(),
        )
    }
}

impl From<Vec<Frame>> for Frames {
    fn from(frames: Vec<Frame>) -> Self {
        Self(frames)
    }
}

impl FromIterator<Frame> for Frames {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Frames {
    type Item = Frame;
    type IntoIter = std::vec::IntoIter<Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Frames {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
