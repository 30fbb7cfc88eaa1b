//! Concept port - The contract every independent module implements.
//!
//! A concept owns its state and never references another concept. The engine
//! only reaches it through this trait: actions mutate and report, queries read.

use async_trait::async_trait;

use crate::domain::sync::Fields;

/// Port for a self-contained concept.
///
/// Implementations must ensure:
/// - `perform` never panics on bad input; failures are `{error: message}` outputs
/// - `query` never mutates and never fails; no match is an empty vector
/// - Action names do not start with `_`; query names do
///
/// # Example
///
/// ```ignore
/// let output = team.perform("create", input).await;
/// let rows = team.query("_getById", fields_of(json!({"team": id}))).await;
/// ```
#[async_trait]
pub trait Concept: Send + Sync {
    /// Unique concept name, e.g. `"Team"`.
    fn name(&self) -> &str;

    /// Names of the mutating actions.
    fn actions(&self) -> &[&'static str];

    /// Names of the read-only queries, each prefixed with `_`.
    fn queries(&self) -> &[&'static str];

    /// Runs an action. Unknown actions return an `{error}` output.
    async fn perform(&self, action: &str, input: Fields) -> Fields;

    /// Runs a query. Unknown queries return no rows.
    async fn query(&self, name: &str, input: Fields) -> Vec<Fields>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that trait is object-safe
    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn Concept) {}

    #[allow(dead_code)]
    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn concept_is_send_sync() {
        #[allow(dead_code)]
        fn check<T: Concept>() {
            assert_send_sync::<T>();
        }
    }
}
