// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed document store.
//!
//! Documents live as JSON text in a single `documents` table keyed by
//! `(collection, id)`. Filters, updates and pipelines are evaluated in Rust
//! on the connection thread, so a read-modify-write inside one `call` is
//! atomic with respect to every other store operation.

use async_trait::async_trait;
use autoboy_core::document::{ID_FIELD, document_id, run_pipeline};
use autoboy_core::ids::new_document_id;
use autoboy_core::{
    AdapterType, AutoboyError, ChangeKind, ChangeStream, Document, DocumentStore, Filter,
    FindOptions, HealthStatus, PluginAdapter, Stage, Update, UpdateResult,
};
use rusqlite::{OptionalExtension, params};
use serde_json::Value;
use tracing::debug;

use crate::changes::ChangeFeed;
use crate::database::{Database, map_tr_err};

/// [`DocumentStore`] over a [`Database`].
pub struct SqliteStore {
    db: Database,
    changes: ChangeFeed,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            changes: ChangeFeed::new(),
        }
    }

    /// Open the database file at `path` and wrap it.
    pub async fn open(path: &str) -> Result<Self, AutoboyError> {
        Ok(Self::new(Database::open(path).await?))
    }

    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        limit: Option<usize>,
    ) -> Result<UpdateResult, AutoboyError> {
        let coll = collection.to_string();
        let filter = filter.clone();
        let update = update.clone();

        let (result, changed) = self
            .db
            .connection()
            .call(move |conn| {
                let tx = conn.transaction()?;
                let rows = load(&tx, &coll, id_hint(&filter))?;
                let mut result = UpdateResult::default();
                let mut changed = Vec::new();
                for (seq, mut doc) in rows
                    .into_iter()
                    .filter(|(_, d)| filter.matches(d))
                    .take(limit.unwrap_or(usize::MAX))
                {
                    result.matched += 1;
                    if update.apply(&mut doc) {
                        tx.execute(
                            "UPDATE documents SET body = ?1 WHERE seq = ?2",
                            params![encode(&doc)?, seq],
                        )?;
                        result.modified += 1;
                        changed.push(doc);
                    }
                }
                tx.commit()?;
                Ok((result, changed))
            })
            .await
            .map_err(map_tr_err)?;

        for doc in changed {
            let id = document_id(&doc).unwrap_or_default().to_string();
            self.changes.publish(collection, id, ChangeKind::Update, doc);
        }
        Ok(result)
    }
}

/// Narrow the scan to one row when the filter pins `_id`.
fn id_hint(filter: &Filter) -> Option<String> {
    match filter {
        Filter::Eq(field, Value::String(id)) if field == ID_FIELD => Some(id.clone()),
        Filter::And(parts) => parts.iter().find_map(id_hint),
        _ => None,
    }
}

fn load(
    conn: &rusqlite::Connection,
    collection: &str,
    id: Option<String>,
) -> Result<Vec<(i64, Document)>, rusqlite::Error> {
    let decode_row = |row: &rusqlite::Row<'_>| -> Result<(i64, Document), rusqlite::Error> {
        let seq: i64 = row.get(0)?;
        let body: String = row.get(1)?;
        let doc = serde_json::from_str(&body).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok((seq, doc))
    };

    match id {
        Some(id) => {
            let row = conn
                .query_row(
                    "SELECT seq, body FROM documents WHERE collection = ?1 AND id = ?2",
                    params![collection, id],
                    decode_row,
                )
                .optional()?;
            Ok(row.into_iter().collect())
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT seq, body FROM documents WHERE collection = ?1 ORDER BY seq",
            )?;
            let rows = stmt.query_map(params![collection], decode_row)?;
            rows.collect()
        }
    }
}

fn encode(doc: &Document) -> Result<String, rusqlite::Error> {
    serde_json::to_string(doc).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, AutoboyError> {
        self.db
            .connection()
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AutoboyError> {
        self.db.checkpoint().await?;
        debug!("shutdown: WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, AutoboyError> {
        let coll = collection.to_string();
        let filter = filter.clone();
        let docs = self
            .db
            .connection()
            .call(move |conn| {
                let rows = load(conn, &coll, id_hint(&filter))?;
                Ok(rows
                    .into_iter()
                    .map(|(_, d)| d)
                    .filter(|d| filter.matches(d))
                    .collect::<Vec<_>>())
            })
            .await
            .map_err(map_tr_err)?;
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

        let coll = collection.to_string();
        let row_id = id.clone();
        let body = serde_json::to_string(&doc)?;
        let inserted = self
            .db
            .connection()
            .call(move |conn| {
                let n = conn.execute(
                    "INSERT OR IGNORE INTO documents (collection, id, body) VALUES (?1, ?2, ?3)",
                    params![coll, row_id, body],
                )?;
                Ok(n == 1)
            })
            .await
            .map_err(map_tr_err)?;

        if !inserted {
            return Err(AutoboyError::Duplicate {
                collection: collection.to_string(),
                id,
            });
        }
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
        let coll = collection.to_string();
        let filter = filter.clone();
        let removed = self
            .db
            .connection()
            .call(move |conn| {
                let tx = conn.transaction()?;
                let target = load(&tx, &coll, id_hint(&filter))?
                    .into_iter()
                    .find(|(_, d)| filter.matches(d));
                if let Some((seq, _)) = &target {
                    tx.execute("DELETE FROM documents WHERE seq = ?1", params![seq])?;
                }
                tx.commit()?;
                Ok(target.map(|(_, d)| d))
            })
            .await
            .map_err(map_tr_err)?;

        match removed {
            Some(doc) => {
                let id = document_id(&doc).unwrap_or_default().to_string();
                self.changes.publish(collection, id, ChangeKind::Delete, doc);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &[Stage],
    ) -> Result<Vec<Document>, AutoboyError> {
        let coll = collection.to_string();
        let docs = self
            .db
            .connection()
            .call(move |conn| {
                Ok(load(conn, &coll, None)?
                    .into_iter()
                    .map(|(_, d)| d)
                    .collect::<Vec<_>>())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(run_pipeline(docs, pipeline))
    }

    async fn count_documents(&self, collection: &str, filter: &Filter) -> Result<u64, AutoboyError> {
        Ok(self
            .find(collection, filter, &FindOptions::default())
            .await?
            .len() as u64)
    }

    fn watch(&self, collection: &str) -> ChangeStream {
        self.changes.subscribe(collection)
    }
}
