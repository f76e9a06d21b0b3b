//! Field validation for edited documents.
//!
//! The server tells us, per issue and per operation, which fields may be set
//! (`meta.fields` in the template context). Anything the user adds beyond
//! that set is rejected before we ever hit the network.

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field {field} is not editable")]
    NotEditable { field: String },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::NotEditable { field } => field,
        }
    }
}

/// Check that every key under `fields` is in `allowed`.
///
/// Keys are checked in sorted order and the first unknown one is reported.
/// With no `allowed` set (no metadata supplied) everything passes.
pub fn validate_fields(
    document: &Map<String, Value>,
    allowed: Option<&BTreeSet<String>>,
) -> Result<(), ValidationError> {
    let Some(allowed) = allowed else {
        return Ok(());
    };
    let Some(Value::Object(fields)) = document.get("fields") else {
        return Ok(());
    };

    let mut names: Vec<&String> = fields.keys().collect();
    names.sort();
    match names.into_iter().find(|name| !allowed.contains(*name)) {
        Some(field) => Err(ValidationError::NotEditable {
            field: field.clone(),
        }),
        None => Ok(()),
    }
}

/// Extract the editable field names from a template context's `meta.fields`.
///
/// Returns `None` when the context carries no field metadata.
pub fn allowed_fields(context: &Map<String, Value>) -> Option<BTreeSet<String>> {
    match context.get("meta")?.get("fields")? {
        Value::Object(fields) => Some(fields.keys().cloned().collect()),
        _ => None,
    }
}
