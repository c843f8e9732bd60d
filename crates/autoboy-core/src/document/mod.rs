// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document model for the collection-addressed store.
//!
//! Documents are JSON objects keyed by a string `_id`. Fields are addressed
//! by dotted paths (`notification_preferences.sms`). [`Filter`], [`Update`]
//! and [`Stage`] are evaluated here so every store backend shares the same
//! matching and mutation semantics.

mod filter;
mod pipeline;
mod update;

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::AutoboyError;

pub use filter::Filter;
pub use pipeline::{FindOptions, SortOrder, Stage, run_pipeline, sort_documents};
pub use update::Update;

/// A stored document.
pub type Document = Map<String, Value>;

/// Primary key field of every document.
pub const ID_FIELD: &str = "_id";

/// Returns the document's `_id`, if it is a string.
pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

/// Resolve a dotted path inside a document.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Set a dotted path, creating (or replacing non-object) intermediate levels.
pub fn set_path(doc: &mut Document, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                set_path(child, rest, value);
            }
        }
    }
}

/// Remove a dotted path, returning the removed value.
pub fn remove_path(doc: &mut Document, path: &str) -> Option<Value> {
    match path.split_once('.') {
        None => doc.remove(path),
        Some((head, rest)) => match doc.get_mut(head)? {
            Value::Object(child) => remove_path(child, rest),
            _ => None,
        },
    }
}

/// Serialize a typed record into a document.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, AutoboyError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(AutoboyError::Internal(format!(
            "expected a JSON object document, got {other}"
        ))),
    }
}

/// Deserialize a document into a typed record.
pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, AutoboyError> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

/// Encode a timestamp the way stored documents carry it.
pub fn timestamp_value(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
}

/// Ordered comparison of two scalar values.
///
/// Numbers compare numerically, RFC 3339 strings chronologically, other
/// strings lexicographically, booleans false-before-true. Values of
/// different kinds are incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => {
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(dx), Ok(dy)) => Some(dx.cmp(&dy)),
                _ => Some(x.cmp(y)),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Equality used by filters: numeric and chronological equivalence for
/// scalars, structural equality for arrays and objects.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match compare_values(a, b) {
        Some(ordering) => ordering == Ordering::Equal,
        None => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn dotted_paths_resolve_nested_fields() {
        let d = doc(json!({"prefs": {"sms": true}, "name": "x"}));
        assert_eq!(get_path(&d, "prefs.sms"), Some(&json!(true)));
        assert_eq!(get_path(&d, "name"), Some(&json!("x")));
        assert!(get_path(&d, "prefs.email").is_none());
        assert!(get_path(&d, "name.inner").is_none());
    }

    #[test]
    fn set_path_creates_intermediate_objects() {
        let mut d = Document::new();
        set_path(&mut d, "a.b.c", json!(1));
        assert_eq!(Value::Object(d.clone()), json!({"a": {"b": {"c": 1}}}));

        set_path(&mut d, "a", json!("flat"));
        set_path(&mut d, "a.x", json!(2));
        assert_eq!(Value::Object(d), json!({"a": {"x": 2}}));
    }

    #[test]
    fn remove_path_returns_removed_value() {
        let mut d = doc(json!({"a": {"b": 1, "c": 2}}));
        assert_eq!(remove_path(&mut d, "a.b"), Some(json!(1)));
        assert_eq!(Value::Object(d.clone()), json!({"a": {"c": 2}}));
        assert_eq!(remove_path(&mut d, "missing.path"), None);
    }

    #[test]
    fn timestamps_compare_chronologically() {
        let earlier = json!("2026-03-01T12:00:00Z");
        let later = json!("2026-03-01T12:00:00.500Z");
        assert_eq!(compare_values(&earlier, &later), Some(Ordering::Less));
    }

    #[test]
    fn integers_and_floats_are_equal_when_numerically_equal() {
        assert!(values_equal(&json!(100), &json!(100.0)));
        assert!(!values_equal(&json!(100), &json!("100")));
    }

    #[test]
    fn to_document_rejects_non_objects() {
        assert!(to_document(&42).is_err());
        let d = to_document(&json!({"k": "v"})).unwrap();
        assert_eq!(d["k"], "v");
    }
}
