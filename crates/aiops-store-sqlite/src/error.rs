// aiops-store-sqlite/src/error.rs
// ============================================================================
// Module: Store Errors
// Description: The SQLite store's own error type, and its mapping onto the
//              two trait-seam error types it implements against.
// Dependencies: thiserror, aiops-core
// ============================================================================

use aiops_core::GraphStoreError;
use aiops_core::WorkflowStoreError;
use thiserror::Error;

/// Errors raised by [`crate::SqliteStore`], before being narrowed to the
/// [`GraphStoreError`] or [`WorkflowStoreError`] a given trait method
/// returns.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Filesystem I/O failed opening or preparing the database file.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// A SQLite query or statement failed.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored data failed to deserialize or did not match its expected
    /// shape.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// The caller supplied invalid data (e.g. a depth past the allowed
    /// maximum).
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// The on-disk schema version does not match what this crate expects.
    #[error("sqlite store schema version mismatch: found {found}, expected {expected}")]
    VersionMismatch {
        /// The version recorded in `store_meta`.
        found: i64,
        /// The version this crate expects.
        expected: i64,
    },
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Db(err.to_string())
    }
}

impl From<serde_json::Error> for SqliteStoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupt(err.to_string())
    }
}

impl From<SqliteStoreError> for GraphStoreError {
    fn from(err: SqliteStoreError) -> Self {
        match err {
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            other => Self::Io(other.to_string()),
        }
    }
}

impl From<SqliteStoreError> for WorkflowStoreError {
    fn from(err: SqliteStoreError) -> Self {
        match err {
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            other => Self::Io(other.to_string()),
        }
    }
}
