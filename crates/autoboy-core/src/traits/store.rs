// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The store facade: a collection-addressed document store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::broadcast;

use crate::document::{Document, Filter, FindOptions, Stage};
use crate::error::AutoboyError;
use crate::traits::adapter::PluginAdapter;

/// Outcome of `update_one` / `update_many`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    /// Documents the filter matched.
    pub matched: u64,
    /// Documents whose content actually changed.
    pub modified: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A committed write, published to `watch` subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub collection: String,
    pub id: String,
    pub kind: ChangeKind,
    /// Post-image for inserts and updates, the removed document for deletes.
    pub document: Document,
}

/// Subscription to one collection's change events.
///
/// Wraps a broadcast receiver shared by all collections; events for other
/// collections are skipped. A subscriber that falls behind skips the events
/// it missed.
pub struct ChangeStream {
    collection: String,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl ChangeStream {
    pub fn new(collection: impl Into<String>, rx: broadcast::Receiver<ChangeEvent>) -> Self {
        Self {
            collection: collection.into(),
            rx,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Next event for this collection, or `None` once the store is gone.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.collection == self.collection => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        collection = %self.collection,
                        skipped,
                        "change stream lagged, events skipped"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Document store consumed by the hub (conversation ACL, sessions) and the
/// alert engine (alerts, products, users, notifications).
///
/// Each operation on a single document is atomic. `update_one` evaluates the
/// filter and applies the update as one step, which makes it the
/// compare-and-set primitive the alert engine relies on. Callers bound each
/// call with [`within`](crate::deadline::within).
#[async_trait]
pub trait DocumentStore: PluginAdapter {
    /// Matching documents in insertion order unless `options` sorts them.
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, AutoboyError>;

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, AutoboyError> {
        let mut docs = self
            .find(collection, filter, &FindOptions::default().limit(1))
            .await?;
        Ok(docs.pop())
    }

    /// Insert a document, assigning `_id` when absent. Returns the id.
    ///
    /// Fails with [`AutoboyError::Duplicate`] if the id is taken.
    async fn insert_one(&self, collection: &str, doc: Document) -> Result<String, AutoboyError>;

    /// Apply `update` to the first document matching `filter`.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &crate::document::Update,
    ) -> Result<UpdateResult, AutoboyError>;

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &crate::document::Update,
    ) -> Result<UpdateResult, AutoboyError>;

    /// Delete the first matching document. Returns the number removed.
    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, AutoboyError>;

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &[Stage],
    ) -> Result<Vec<Document>, AutoboyError>;

    async fn count_documents(&self, collection: &str, filter: &Filter)
    -> Result<u64, AutoboyError>;

    /// Subscribe to committed writes on a collection.
    fn watch(&self, collection: &str) -> ChangeStream;
}
