// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document store backends for the AutoBoy backend.
//!
//! [`MemoryStore`] keeps collections in process memory; [`SqliteStore`]
//! persists them as JSON rows in a WAL-mode SQLite file with embedded
//! migrations and a single-writer connection via `tokio-rusqlite`. Both
//! publish committed writes to `watch` subscribers.

mod changes;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod sqlite;

use std::sync::Arc;

use autoboy_config::{StorageBackend, StorageConfig};
use autoboy_core::{AutoboyError, DocumentStore};
use tracing::info;

pub use database::Database;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Open the backend selected by `[storage]`.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn DocumentStore>, AutoboyError> {
    match config.backend {
        StorageBackend::Memory => {
            info!("using in-memory document store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Sqlite => {
            let store = SqliteStore::open(&config.database_path).await?;
            info!(path = %config.database_path, "using SQLite document store");
            Ok(Arc::new(store))
        }
    }
}
