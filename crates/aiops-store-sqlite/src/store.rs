// aiops-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Store
// Description: The shared connection and construction logic for the
//              GraphStore (C1) and WorkflowStore (C7) implementations.
// Purpose: One SQLite file backs both stores, matching
//          `aiops_config::BackendsConfig::store_path`'s single-path config
//          surface; a single `Mutex<Connection>` guards it, mirroring
//          `aiops_dispatch::lease::LeaseManager`'s single-mutex style rather
//          than a writer-queue/read-pool architecture, which this crate's
//          scope does not need.
// Dependencies: rusqlite, std::sync::Mutex
// ============================================================================

//! ## Overview
//! [`SqliteStore`] implements both [`aiops_core::GraphStore`] (C1) and
//! [`aiops_core::WorkflowStore`] (C7) against one on-disk SQLite database.
//! Every access takes the same `Mutex<Connection>`; there is no separate
//! read-connection pool or background writer thread, since this store's
//! expected concurrency (one executor, one CLI invocation at a time) does
//! not warrant one.

use std::path::PathBuf;
use std::sync::Mutex;

use rusqlite::Connection;

use crate::config::SqliteStoreConfig;
use crate::connection::ensure_parent_dir;
use crate::connection::initialize_schema;
use crate::connection::open_connection;
use crate::connection::validate_store_path;
use crate::error::SqliteStoreError;

/// A SQLite-backed evidence graph store and workflow store, sharing one
/// database file.
pub struct SqliteStore {
    /// The single guarded connection every method serializes through.
    pub(crate) connection: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (creating if necessary) the database at `config.path`,
    /// applying pragmas and initializing or validating the schema.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] if the path is invalid, the parent
    /// directory cannot be created, the connection cannot be opened, or the
    /// schema cannot be initialized or validated.
    pub fn open(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        tracing::info!(path = %config.path.display(), "opening sqlite store");
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self { connection: Mutex::new(connection) })
    }

    /// Convenience constructor taking just the database file path, using
    /// this crate's default connection tuning.
    ///
    /// # Errors
    ///
    /// See [`SqliteStore::open`].
    pub fn open_at(path: PathBuf) -> Result<Self, SqliteStoreError> {
        Self::open(SqliteStoreConfig::new(path))
    }

    /// Verifies the store can execute a trivial statement.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Db`] if the mutex is poisoned or the
    /// query fails.
    pub(crate) fn check_connection(&self) -> Result<(), SqliteStoreError> {
        let guard = self.connection.lock().map_err(|_| SqliteStoreError::Db("sqlite mutex poisoned".to_owned()))?;
        guard.execute("SELECT 1", [])?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test setup only")]
mod tests {
    use tempfile::tempdir;

    use super::SqliteStore;

    #[test]
    fn open_creates_schema_on_fresh_file() {
        let dir = tempdir().expect("tempdir");
        let store = SqliteStore::open_at(dir.path().join("store.sqlite3")).expect("open");
        store.check_connection().expect("connection healthy");
    }

    #[test]
    fn reopening_an_existing_store_succeeds() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("store.sqlite3");
        drop(SqliteStore::open_at(path.clone()).expect("first open"));
        let reopened = SqliteStore::open_at(path).expect("second open");
        reopened.check_connection().expect("connection healthy");
    }
}
