// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde_json::{Number, Value};

use super::{Document, ID_FIELD, get_path, remove_path, set_path};

#[derive(Debug, Clone, PartialEq)]
struct PushCapped {
    field: String,
    value: Value,
    max: usize,
}

/// A field-level mutation applied to a single document.
///
/// Operations run in a fixed order: `set`, `unset`, `inc`, `push_capped`.
/// Writes to `_id` are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    set: Vec<(String, Value)>,
    unset: Vec<String>,
    inc: Vec<(String, f64)>,
    push: Vec<PushCapped>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.push((field.into(), value.into()));
        self
    }

    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.unset.push(field.into());
        self
    }

    /// Add `delta` to a numeric field; a missing field starts at zero.
    pub fn inc(mut self, field: impl Into<String>, delta: f64) -> Self {
        self.inc.push((field.into(), delta));
        self
    }

    /// Append to an array field, keeping only the newest `max` elements.
    pub fn push_capped(mut self, field: impl Into<String>, value: impl Into<Value>, max: usize) -> Self {
        self.push.push(PushCapped {
            field: field.into(),
            value: value.into(),
            max,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty() && self.inc.is_empty() && self.push.is_empty()
    }

    /// Apply to a document in place. Returns whether anything changed.
    pub fn apply(&self, doc: &mut Document) -> bool {
        let before = doc.clone();

        for (field, value) in &self.set {
            if field != ID_FIELD {
                set_path(doc, field, value.clone());
            }
        }
        for field in &self.unset {
            if field != ID_FIELD {
                remove_path(doc, field);
            }
        }
        for (field, delta) in &self.inc {
            if field == ID_FIELD {
                continue;
            }
            let next = match get_path(doc, field) {
                None | Some(Value::Null) => number(*delta),
                Some(Value::Number(current)) => match (current.as_i64(), delta.fract() == 0.0) {
                    (Some(i), true) => Some(Number::from(i.saturating_add(*delta as i64))),
                    _ => current.as_f64().and_then(|c| number(c + delta)),
                },
                Some(_) => None,
            };
            if let Some(n) = next {
                set_path(doc, field, Value::Number(n));
            }
        }
        for push in &self.push {
            if push.field == ID_FIELD {
                continue;
            }
            let mut items = match get_path(doc, &push.field) {
                Some(Value::Array(items)) => items.clone(),
                _ => Vec::new(),
            };
            items.push(push.value.clone());
            if items.len() > push.max {
                let excess = items.len() - push.max;
                items.drain(..excess);
            }
            set_path(doc, &push.field, Value::Array(items));
        }

        *doc != before
    }
}

fn number(value: f64) -> Option<Number> {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(Number::from(value as i64))
    } else {
        Number::from_f64(value)
    }
}
