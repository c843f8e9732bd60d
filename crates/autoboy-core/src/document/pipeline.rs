// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::Value;

use super::{Document, Filter, ID_FIELD, compare_values, get_path, set_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// One step of an aggregation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    Sort(Vec<(String, SortOrder)>),
    Skip(usize),
    Limit(usize),
    /// Keep `_id` plus the listed fields.
    Project(Vec<String>),
    /// Bucket by a field, emitting `{_id: value, <count_as>: n}` per bucket
    /// in first-seen order.
    Group { by: String, count_as: String },
    /// Collapse to a single `{<field>: n}` document.
    Count(String),
}

/// Sorting and paging for `find`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Vec<(String, SortOrder)>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push((field.into(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    /// Apply to an already-filtered result set.
    pub fn apply(&self, mut docs: Vec<Document>) -> Vec<Document> {
        if !self.sort.is_empty() {
            sort_documents(&mut docs, &self.sort);
        }
        let iter = docs.into_iter().skip(self.skip);
        match self.limit {
            Some(n) => iter.take(n).collect(),
            None => iter.collect(),
        }
    }
}

/// Stable sort by the given keys. Missing and null sort first, then
/// booleans, numbers, strings, and finally arrays and objects.
pub fn sort_documents(docs: &mut [Document], keys: &[(String, SortOrder)]) {
    docs.sort_by(|a, b| {
        for (field, order) in keys {
            let ord = total_cmp(get_path(a, field), get_path(b, field));
            let ord = match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

fn total_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    rank(a).cmp(&rank(b)).then_with(|| match (a, b) {
        (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    })
}

/// Run an aggregation pipeline over a collection snapshot.
pub fn run_pipeline(mut docs: Vec<Document>, stages: &[Stage]) -> Vec<Document> {
    for stage in stages {
        docs = match stage {
            Stage::Match(filter) => docs.into_iter().filter(|d| filter.matches(d)).collect(),
            Stage::Sort(keys) => {
                sort_documents(&mut docs, keys);
                docs
            }
            Stage::Skip(n) => docs.into_iter().skip(*n).collect(),
            Stage::Limit(n) => docs.into_iter().take(*n).collect(),
            Stage::Project(fields) => docs.iter().map(|d| project(d, fields)).collect(),
            Stage::Group { by, count_as } => group(&docs, by, count_as),
            Stage::Count(field) => {
                let mut out = Document::new();
                out.insert(field.clone(), Value::from(docs.len()));
                vec![out]
            }
        };
    }
    docs
}

fn project(doc: &Document, fields: &[String]) -> Document {
    let mut out = Document::new();
    if let Some(id) = doc.get(ID_FIELD) {
        out.insert(ID_FIELD.to_string(), id.clone());
    }
    for field in fields {
        if let Some(value) = get_path(doc, field) {
            set_path(&mut out, field, value.clone());
        }
    }
    out
}

fn group(docs: &[Document], by: &str, count_as: &str) -> Vec<Document> {
    let mut order: Vec<Value> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for doc in docs {
        let key = get_path(doc, by).cloned().unwrap_or(Value::Null);
        let fingerprint = key.to_string();
        let count = counts.entry(fingerprint).or_insert_with(|| {
            order.push(key.clone());
            0
        });
        *count += 1;
    }
    order
        .into_iter()
        .map(|key| {
            let n = counts.get(&key.to_string()).copied().unwrap_or(0);
            let mut out = Document::new();
            out.insert(ID_FIELD.to_string(), key);
            out.insert(count_as.to_string(), Value::from(n));
            out
        })
        .collect()
}
