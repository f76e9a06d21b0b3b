//! The user-edited document.
//!
//! YAML written by a human is looser than the JSON Jira accepts: blank
//! template slots come back as empty strings, keys can be numbers, and
//! values can carry tags. `fixup` normalizes all of that into a JSON value
//! before anything else looks at the document.

use serde_json::{Map, Number, Value};
use serde_yaml::Value as Yaml;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("YAML: document must be a mapping, found {0}")]
    NotAMapping(&'static str),
    #[error("YAML: key {key} is a {kind}, require a string")]
    BadKey { key: String, kind: &'static str },
    #[error("YAML: value {0} cannot be represented in JSON")]
    BadNumber(String),
}

/// A parsed, fixed-up edited document.
#[derive(Debug, Clone, PartialEq)]
pub struct EditedDocument {
    root: Map<String, Value>,
}

impl EditedDocument {
    /// Parse YAML text and apply fix-ups.
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let yaml: Yaml = serde_yaml::from_str(text)?;
        match fixup(&yaml)? {
            None => Ok(Self { root: Map::new() }),
            Some(Value::Object(root)) => Ok(Self { root }),
            Some(other) => Err(DocumentError::NotAMapping(json_kind(&other))),
        }
    }

    /// True when the user asked to cancel with `abort: true`.
    pub fn is_abort(&self) -> bool {
        matches!(self.root.get("abort"), Some(Value::Bool(true)))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Serialize to the JSON request payload.
    pub fn to_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.root)
    }
}

/// Normalize a YAML value into JSON.
///
/// - nulls, empty strings (and a lone newline), empty mappings and empty
///   sequences are dropped, recursively
/// - mapping keys must be scalars; numbers and booleans are stringified
/// - tags are stripped
///
/// Returns `None` when the whole value collapses to nothing.
pub fn fixup(value: &Yaml) -> Result<Option<Value>, DocumentError> {
    match value {
        Yaml::Null => Ok(None),
        Yaml::Bool(b) => Ok(Some(Value::Bool(*b))),
        Yaml::Number(n) => number(n).map(Some),
        Yaml::String(s) => {
            if s.is_empty() || s == "\n" {
                Ok(None)
            } else {
                Ok(Some(Value::String(s.clone())))
            }
        }
        Yaml::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if let Some(fixed) = fixup(item)? {
                    out.push(fixed);
                }
            }
            Ok(if out.is_empty() {
                None
            } else {
                Some(Value::Array(out))
            })
        }
        Yaml::Mapping(mapping) => {
            let mut out = Map::new();
            for (key, val) in mapping {
                let key = key_string(key)?;
                if let Some(fixed) = fixup(val)? {
                    out.insert(key, fixed);
                }
            }
            Ok(if out.is_empty() {
                None
            } else {
                Some(Value::Object(out))
            })
        }
        Yaml::Tagged(tagged) => fixup(&tagged.value),
    }
}

fn number(n: &serde_yaml::Number) -> Result<Value, DocumentError> {
    if let Some(i) = n.as_i64() {
        Ok(Value::Number(i.into()))
    } else if let Some(u) = n.as_u64() {
        Ok(Value::Number(u.into()))
    } else {
        n.as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| DocumentError::BadNumber(n.to_string()))
    }
}

fn key_string(key: &Yaml) -> Result<String, DocumentError> {
    match key {
        Yaml::String(s) => Ok(s.clone()),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Tagged(tagged) => key_string(&tagged.value),
        other => Err(DocumentError::BadKey {
            key: serde_yaml::to_string(other)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            kind: yaml_kind(other),
        }),
    }
}

fn yaml_kind(value: &Yaml) -> &'static str {
    match value {
        Yaml::Null => "null",
        Yaml::Bool(_) => "boolean",
        Yaml::Number(_) => "number",
        Yaml::String(_) => "string",
        Yaml::Sequence(_) => "sequence",
        Yaml::Mapping(_) => "mapping",
        Yaml::Tagged(_) => "tagged value",
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_drops_blank_slots() {
        let doc = EditedDocument::parse(
            r#"
fields:
  summary: Fix the thing
  description: ""
  labels: []
  assignee:
  components:
    - name: ""
  priority:
    name: Major
"#,
        )
        .unwrap();

        assert_eq!(
            doc.get("fields"),
            Some(&json!({"summary": "Fix the thing", "priority": {"name": "Major"}}))
        );
    }

    #[test]
    fn test_parse_stringifies_scalar_keys() {
        let doc = EditedDocument::parse("fields:\n  10: ten\n  true: yes-ish\n").unwrap();
        assert_eq!(doc.get("fields"), Some(&json!({"10": "ten", "true": "yes-ish"})));
    }

    #[test]
    fn test_parse_rejects_complex_keys() {
        let err = EditedDocument::parse("? [a, b]\n: value\n").unwrap_err();
        assert!(matches!(err, DocumentError::BadKey { kind: "sequence", .. }));
    }

    #[test]
    fn test_parse_rejects_non_mapping() {
        let err = EditedDocument::parse("- just\n- a list\n").unwrap_err();
        assert!(matches!(err, DocumentError::NotAMapping("sequence")));
    }

    #[test]
    fn test_parse_rejects_infinity() {
        let err = EditedDocument::parse("fields:\n  estimate: .inf\n").unwrap_err();
        assert!(matches!(err, DocumentError::BadNumber(_)));
    }

    #[test]
    fn test_empty_document_is_empty_mapping() {
        let doc = EditedDocument::parse("# nothing but comments\n").unwrap();
        assert!(doc.as_map().is_empty());
        assert_eq!(doc.to_payload().unwrap(), "{}");
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        assert!(matches!(
            EditedDocument::parse("fields: [unclosed"),
            Err(DocumentError::Yaml(_))
        ));
    }

    #[test]
    fn test_abort_flag() {
        assert!(EditedDocument::parse("abort: true\n").unwrap().is_abort());
        assert!(!EditedDocument::parse("abort: false\n").unwrap().is_abort());
        assert!(!EditedDocument::parse("abort: \"true\"\n").unwrap().is_abort());
    }

    #[test]
    fn test_payload_keeps_numbers_and_bools() {
        let doc = EditedDocument::parse("fields:\n  points: 3\n  ratio: 0.5\n  flag: false\n")
            .unwrap();
        let payload: Value = serde_json::from_str(&doc.to_payload().unwrap()).unwrap();
        assert_eq!(payload, json!({"fields": {"points": 3, "ratio": 0.5, "flag": false}}));
    }
}
