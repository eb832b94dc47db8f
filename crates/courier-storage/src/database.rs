// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use std::path::PathBuf;

use courier_config::model::StorageConfig;
use courier_core::CourierError;
use tracing::debug;

/// Handle to the Courier SQLite database.
///
/// Cloning is cheap: clones share the same background connection thread,
/// which is what keeps concurrent callers free of `SQLITE_BUSY`.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if necessary) the database at the configured path,
    /// apply connection PRAGMAs, and run any pending migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, CourierError> {
        let path = PathBuf::from(&config.database_path);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| CourierError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| CourierError::Storage {
                source: Box::new(e),
            })?;

        let wal_mode = config.wal_mode;
        conn.call(move |conn| {
            let to_storage = |e: rusqlite::Error| CourierError::Storage {
                source: Box::new(e),
            };
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")
                    .map_err(to_storage)?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")
                .map_err(to_storage)?;
            conn.pragma_update(None, "foreign_keys", "ON")
                .map_err(to_storage)?;
            conn.pragma_update(None, "busy_timeout", 5000)
                .map_err(to_storage)?;
            crate::migrations::run_migrations(conn)?;
            Ok::<(), CourierError>(())
        })
        .await
        .map_err(|e| CourierError::Storage {
            source: Box::new(e),
        })?;

        debug!(path = %config.database_path, "database opened");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection. Query modules call through
    /// `connection().call()`.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Trivial read used by the health monitor's reachability probe.
    pub async fn ping(&self) -> Result<(), CourierError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Flush the WAL before the process exits.
    pub async fn close(&self) -> Result<(), CourierError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("close: WAL checkpoint complete");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into the workspace error type.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> CourierError {
    CourierError::Storage {
        source: Box::new(e),
    }
}
