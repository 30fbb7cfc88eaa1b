//! JSON object helpers shared by action inputs, outputs and query rows.

use serde_json::{Map, Value};

use crate::domain::foundation::{DomainError, ValidationError};

/// The shape of every action input, action output and query row.
pub type Fields = Map<String, Value>;

/// Output key that marks an action result as a domain failure.
pub const ERROR_KEY: &str = "error";

/// Converts a JSON value into fields. Non-object values yield an empty object.
pub fn fields_of(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

/// Builds the `{error: message}` output for a failed action.
pub fn error_output(message: impl Into<String>) -> Fields {
    let mut out = Fields::new();
    out.insert(ERROR_KEY.to_string(), Value::String(message.into()));
    out
}

/// Returns true when an action output carries an `error` field.
pub fn is_error(output: &Fields) -> bool {
    output.contains_key(ERROR_KEY)
}

/// Flattens an action implementation's result into the action contract.
pub fn into_output(result: Result<Fields, DomainError>) -> Fields {
    match result {
        Ok(fields) => fields,
        Err(err) => error_output(err.message),
    }
}

/// Reads a required, non-empty string field. `null` counts as missing.
pub fn require_str(input: &Fields, key: &str) -> Result<String, ValidationError> {
    match input.get(key) {
        Some(Value::String(s)) if s.trim().is_empty() => Err(ValidationError::empty_field(key)),
        Some(Value::String(s)) => Ok(s.clone()),
        None | Some(Value::Null) => Err(ValidationError::missing_field(key)),
        Some(_) => Err(ValidationError::invalid_format(key, "expected a string")),
    }
}

/// Reads an optional string field, treating `null` as absent.
pub fn optional_str(input: &Fields, key: &str) -> Result<Option<String>, ValidationError> {
    match input.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::invalid_format(key, "expected a string")),
    }
}
