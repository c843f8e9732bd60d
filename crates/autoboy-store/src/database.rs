// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite connection management: PRAGMAs, WAL mode and migrations.
//!
//! Every statement runs on tokio-rusqlite's single background thread, which
//! serializes all writes. Do not open a second connection for writes.

use std::path::Path;

use autoboy_core::AutoboyError;
use tracing::debug;

use crate::migrations;

/// An open, migrated SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database file at `path` in WAL mode.
    pub async fn open(path: &str) -> Result<Self, AutoboyError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(AutoboyError::store)?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(AutoboyError::store)?;
        let db = Self { conn };
        db.prepare(true).await?;
        debug!(path, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database, for tests.
    pub async fn open_in_memory() -> Result<Self, AutoboyError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(AutoboyError::store)?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    async fn prepare(&self, wal: bool) -> Result<(), AutoboyError> {
        self.conn
            .call(move |conn| {
                if wal {
                    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
                }
                conn.execute_batch(
                    "PRAGMA synchronous = NORMAL;
                     PRAGMA busy_timeout = 5000;
                     PRAGMA foreign_keys = ON;",
                )?;
                migrations::run_migrations(conn)?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Fold the WAL back into the main file.
    pub async fn checkpoint(&self) -> Result<(), AutoboyError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> AutoboyError {
    AutoboyError::Store {
        source: Box::new(e),
    }
}
