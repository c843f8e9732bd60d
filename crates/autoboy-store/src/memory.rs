// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local document store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use autoboy_core::document::{ID_FIELD, document_id, run_pipeline};
use autoboy_core::ids::new_document_id;
use autoboy_core::{
    AdapterType, AutoboyError, ChangeKind, ChangeStream, Document, DocumentStore, Filter,
    FindOptions, HealthStatus, PluginAdapter, Stage, Update, UpdateResult,
};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::changes::ChangeFeed;

#[derive(Default)]
struct Collection {
    next_seq: u64,
    /// Documents keyed by insertion sequence.
    docs: BTreeMap<u64, Document>,
    ids: HashMap<String, u64>,
}

impl Collection {
    fn matching(&self, filter: &Filter) -> impl Iterator<Item = (&u64, &Document)> {
        self.docs.iter().filter(move |(_, doc)| filter.matches(doc))
    }
}

/// In-memory [`DocumentStore`] guarded by a single lock.
///
/// Used by tests and by `storage.backend = "memory"`. Contents vanish with
/// the process.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    changes: ChangeFeed,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            changes: ChangeFeed::new(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, AutoboyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AutoboyError> {
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, AutoboyError> {
        let collections = self.collections.read().await;
        let docs = collections
            .get(collection)
            .map(|c| c.matching(filter).map(|(_, d)| d.clone()).collect())
            .unwrap_or_default();
        Ok(options.apply(docs))
    }

    async fn insert_one(&self, collection: &str, mut doc: Document) -> Result<String, AutoboyError> {
        let id = match document_id(&doc) {
            Some(id) => id.to_string(),
            None => {
                let id = new_document_id();
                doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));
                id
            }
        };

        let mut collections = self.collections.write().await;
        let coll = collections.entry(collection.to_string()).or_default();
        if coll.ids.contains_key(&id) {
            return Err(AutoboyError::Duplicate {
                collection: collection.to_string(),
                id,
            });
        }
        let seq = coll.next_seq;
        coll.next_seq += 1;
        coll.ids.insert(id.clone(), seq);
        coll.docs.insert(seq, doc.clone());
        drop(collections);

        self.changes
            .publish(collection, id.clone(), ChangeKind::Insert, doc);
        Ok(id)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<UpdateResult, AutoboyError> {
        self.update(collection, filter, update, Some(1)).await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<UpdateResult, AutoboyError> {
        self.update(collection, filter, update, None).await
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, AutoboyError> {
        let mut collections = self.collections.write().await;
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let Some(seq) = coll.matching(filter).map(|(seq, _)| *seq).next() else {
            return Ok(0);
        };
        let Some(doc) = coll.docs.remove(&seq) else {
            return Ok(0);
        };
        let id = document_id(&doc).unwrap_or_default().to_string();
        coll.ids.remove(&id);
        drop(collections);

        self.changes.publish(collection, id, ChangeKind::Delete, doc);
        Ok(1)
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &[Stage],
    ) -> Result<Vec<Document>, AutoboyError> {
        let snapshot: Vec<Document> = {
            let collections = self.collections.read().await;
            collections
                .get(collection)
                .map(|c| c.docs.values().cloned().collect())
                .unwrap_or_default()
        };
        Ok(run_pipeline(snapshot, pipeline))
    }

    async fn count_documents(&self, collection: &str, filter: &Filter) -> Result<u64, AutoboyError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|c| c.matching(filter).count() as u64)
            .unwrap_or(0))
    }

    fn watch(&self, collection: &str) -> ChangeStream {
        self.changes.subscribe(collection)
    }
}

impl MemoryStore {
    /// Filter and apply under one write lock, so the match and the write are
    /// a single atomic step.
    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        limit: Option<usize>,
    ) -> Result<UpdateResult, AutoboyError> {
        let mut result = UpdateResult::default();
        let mut changed = Vec::new();
        {
            let mut collections = self.collections.write().await;
            let Some(coll) = collections.get_mut(collection) else {
                return Ok(result);
            };
            let targets: Vec<u64> = coll
                .matching(filter)
                .map(|(seq, _)| *seq)
                .take(limit.unwrap_or(usize::MAX))
                .collect();
            for seq in targets {
                let Some(doc) = coll.docs.get_mut(&seq) else {
                    continue;
                };
                result.matched += 1;
                if update.apply(doc) {
                    result.modified += 1;
                    changed.push((document_id(doc).unwrap_or_default().to_string(), doc.clone()));
                }
            }
        }
        for (id, doc) in changed {
            self.changes.publish(collection, id, ChangeKind::Update, doc);
        }
        Ok(result)
    }
}
