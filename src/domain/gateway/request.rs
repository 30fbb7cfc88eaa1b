//! Gateway request and response values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::sync::Fields;

/// Status used when `respond` omits one.
pub const DEFAULT_STATUS: u16 = 200;

/// Inbound request as the gateway sees it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Value,
}

impl ApiRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Builds the `API.request` input.
    ///
    /// Object bodies are flattened into top-level fields so synchronizations
    /// can match on them directly. Flattened keys never replace `method`,
    /// `path`, `headers`, `query` or `body`.
    pub fn into_input(self) -> Fields {
        let mut input = Fields::new();
        input.insert("method".into(), Value::String(self.method));
        input.insert("path".into(), Value::String(self.path));
        input.insert(
            "headers".into(),
            Value::Object(self.headers.into_iter().map(|(k, v)| (k, Value::String(v))).collect()),
        );
        input.insert(
            "query".into(),
            Value::Object(self.query.into_iter().map(|(k, v)| (k, Value::String(v))).collect()),
        );
        if let Value::Object(map) = &self.body {
            for (key, value) in map {
                input.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        input.insert("body".into(), self.body);
        input
    }
}

/// Response delivered through `API.respond`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// The `{status, body}` row returned by `_waitForResponse`.
    pub fn to_row(&self) -> Fields {
        let mut row = Fields::new();
        row.insert("status".into(), Value::from(self.status));
        row.insert("body".into(), self.body.clone());
        row
    }
}
