// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::cmp::Ordering;

use serde_json::Value;

use super::{Document, ID_FIELD, compare_values, get_path, values_equal};

/// A predicate over documents.
///
/// A missing field reads as `null`. `Eq` against an array field matches when
/// any element is equal. Ordered comparisons require comparable kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Value),
    Ne(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    In(String, Vec<Value>),
    Exists(String, bool),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn id(id: impl Into<String>) -> Self {
        Filter::Eq(ID_FIELD.to_string(), Value::String(id.into()))
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Ne(field.into(), value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gt(field.into(), value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gte(field.into(), value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lt(field.into(), value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lte(field.into(), value.into())
    }

    pub fn exists(field: impl Into<String>, present: bool) -> Self {
        Filter::Exists(field.into(), present)
    }

    /// Conjunction, flattening nested `And`s.
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, f) | (f, Filter::All) => f,
            (Filter::And(mut a), Filter::And(b)) => {
                a.extend(b);
                Filter::And(a)
            }
            (Filter::And(mut a), f) => {
                a.push(f);
                Filter::And(a)
            }
            (f, Filter::And(mut b)) => {
                b.insert(0, f);
                Filter::And(b)
            }
            (a, b) => Filter::And(vec![a, b]),
        }
    }

    /// Evaluate the predicate against a document.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, value) => field_eq(doc, field, value),
            Filter::Ne(field, value) => !field_eq(doc, field, value),
            Filter::Gt(field, value) => field_cmp(doc, field, value, |o| o == Ordering::Greater),
            Filter::Gte(field, value) => field_cmp(doc, field, value, |o| o != Ordering::Less),
            Filter::Lt(field, value) => field_cmp(doc, field, value, |o| o == Ordering::Less),
            Filter::Lte(field, value) => field_cmp(doc, field, value, |o| o != Ordering::Greater),
            Filter::In(field, values) => values.iter().any(|v| field_eq(doc, field, v)),
            Filter::Exists(field, present) => get_path(doc, field).is_some() == *present,
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(doc)),
        }
    }
}

fn field_eq(doc: &Document, field: &str, expected: &Value) -> bool {
    let actual = get_path(doc, field).unwrap_or(&Value::Null);
    match actual {
        Value::Array(items) if !expected.is_array() => {
            items.iter().any(|item| values_equal(item, expected))
        }
        _ => values_equal(actual, expected),
    }
}

fn field_cmp(
    doc: &Document,
    field: &str,
    bound: &Value,
    accept: impl Fn(Ordering) -> bool,
) -> bool {
    let Some(actual) = get_path(doc, field) else {
        return false;
    };
    match actual {
        Value::Array(items) => items
            .iter()
            .any(|item| compare_values(item, bound).is_some_and(&accept)),
        _ => compare_values(actual, bound).is_some_and(accept),
    }
}
