//! Placeholder variables for synchronization patterns.
//!
//! Every `Var` carries a process-unique token. A `Vars` allocator hands out one
//! token per name and is created fresh for each synchronization factory call,
//! so two rules that both say `x` never share a binding.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// A placeholder token. Equality, ordering and hashing use the token only.
#[derive(Clone)]
pub struct Var {
    token: u64,
    name: Arc<str>,
}

impl Var {
    fn allocate(name: &str) -> Self {
        Self {
            token: NEXT_TOKEN.fetch_add(1, Ordering::Relaxed),
            name: Arc::from(name),
        }
    }

    /// The opaque process-unique token.
    pub fn token(&self) -> u64 {
        self.token
    }

    /// The human-readable name this variable was declared with.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for Var {}

impl Hash for Var {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token.hash(state);
    }
}

impl PartialOrd for Var {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Var {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.token.cmp(&other.token)
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}#{}", self.name, self.token)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.name)
    }
}

/// Allocator mapping names to tokens for a single synchronization declaration.
#[derive(Debug, Default)]
pub struct Vars {
    by_name: HashMap<String, Var>,
}

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the variable for `name`, allocating a fresh token on first use.
    pub fn var(&mut self, name: &str) -> Var {
        self.by_name
            .entry(name.to_string())
            .or_insert_with(|| Var::allocate(name))
            .clone()
    }

    /// Looks up a variable without allocating.
    pub fn get(&self, name: &str) -> Option<&Var> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_in_one_allocator_yields_same_token() {
        let mut vars = Vars::new();
        let a = vars.var("x");
        let b = vars.var("x");
        assert_eq!(a, b);
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn same_name_in_two_allocators_yields_distinct_tokens() {
        let mut first = Vars::new();
        let mut second = Vars::new();
        let a = first.var("x");
        let b = second.var("x");
        assert_ne!(a, b);
        assert_eq!(a.name(), b.name());
    }

    #[test]
    fn get_does_not_allocate() {
        let vars = Vars::new();
        assert!(vars.get("missing").is_none());
        assert!(vars.is_empty());
    }

    #[test]
    fn display_uses_name_and_debug_includes_token() {
        let mut vars = Vars::new();
        let v = vars.var("team");
        assert_eq!(v.to_string(), "?team");
        assert!(format!("{:?}", v).starts_with("?team#"));
    }
}
