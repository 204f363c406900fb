// aiops-store-sqlite/src/connection.rs
// ============================================================================
// Module: Connection & Schema Setup
// Description: Opens a SQLite connection with secure pragmas and creates or
//              validates the on-disk schema.
// Dependencies: rusqlite
// ============================================================================

use std::path::Path;

use rusqlite::params;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;

use crate::config::SqliteStoreConfig;
use crate::error::SqliteStoreError;

/// The schema version this crate creates and expects to find.
const SCHEMA_VERSION: i64 = 1;
/// Maximum total length of a configured store path.
const MAX_TOTAL_PATH_LENGTH: usize = 4_096;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;

/// Creates `path`'s parent directory tree if it does not already exist.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Io`] if `path` has no parent or the
/// directory cannot be created.
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_owned()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates `path` against basic safety limits before it is opened.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Invalid`] if `path` is empty, exceeds length
/// limits, or already exists as a directory.
pub(crate) fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_owned()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_owned()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_owned(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid("store path must be a file, not a directory".to_owned()));
    }
    Ok(())
}

/// Opens a SQLite connection at `config.path` and applies its pragmas.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Db`] if the connection cannot be opened or a
/// pragma fails to apply.
pub(crate) fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies the durability and concurrency pragmas `config` specifies.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Db`] if any pragma statement fails.
fn apply_pragmas(connection: &Connection, config: &SqliteStoreConfig) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;
    connection.execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))?;
    connection.execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))?;
    connection.busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))?;
    Ok(())
}

/// Creates the schema on a fresh database, or validates the version stamp
/// on an existing one.
///
/// # Errors
///
/// Returns [`SqliteStoreError::VersionMismatch`] if an existing database
/// carries a schema version this crate does not recognize, or
/// [`SqliteStoreError::Db`] if any statement fails.
pub(crate) fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction()?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")?;
    let version: Option<i64> =
        tx.query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0)).optional()?;
    match version {
        None => {
            tracing::info!(version = SCHEMA_VERSION, "initializing fresh sqlite store schema");
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS nodes (
                    id TEXT PRIMARY KEY,
                    data_json TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS edges (
                    id TEXT PRIMARY KEY,
                    from_node TEXT NOT NULL,
                    to_node TEXT NOT NULL,
                    relation TEXT NOT NULL,
                    data_json TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS edges_from_idx ON edges (from_node);
                CREATE TABLE IF NOT EXISTS incidents (
                    id TEXT PRIMARY KEY,
                    data_json TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS journal (
                    incident_id TEXT NOT NULL,
                    seq INTEGER NOT NULL,
                    event_json TEXT NOT NULL,
                    PRIMARY KEY (incident_id, seq)
                );
                CREATE TABLE IF NOT EXISTS actions (
                    idempotency_key TEXT PRIMARY KEY,
                    id TEXT NOT NULL,
                    data_json TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS verifications (
                    id TEXT PRIMARY KEY,
                    action_id TEXT NOT NULL,
                    data_json TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS approvals (
                    action_id TEXT PRIMARY KEY,
                    outcome TEXT,
                    action_summary TEXT NOT NULL,
                    deadline_json TEXT NOT NULL
                );",
            )?;
        }
        Some(found) if found == SCHEMA_VERSION => {
            tracing::debug!(version = found, "sqlite store schema already initialized");
        }
        Some(found) => {
            tracing::error!(found, expected = SCHEMA_VERSION, "sqlite store schema version mismatch");
            return Err(SqliteStoreError::VersionMismatch { found, expected: SCHEMA_VERSION });
        }
    }
    tx.commit()?;
    Ok(())
}
