// aiops-store-sqlite/src/config.rs
// ============================================================================
// Module: Store Configuration
// Description: Connection tuning knobs for the SQLite-backed stores.
// Dependencies: std::path
// ============================================================================

use std::path::PathBuf;

/// SQLite `journal_mode` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqliteStoreMode {
    /// Write-ahead logging; allows concurrent readers during a write.
    Wal,
    /// The default rollback journal.
    Delete,
}

impl SqliteStoreMode {
    /// The `PRAGMA journal_mode` value for this mode.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "WAL",
            Self::Delete => "DELETE",
        }
    }
}

/// SQLite `synchronous` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqliteSyncMode {
    /// `FULL`: fsync on every transaction commit.
    Full,
    /// `NORMAL`: fsync less often; safe under WAL.
    Normal,
}

impl SqliteSyncMode {
    /// The `PRAGMA synchronous` value for this mode.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "FULL",
            Self::Normal => "NORMAL",
        }
    }
}

/// Connection and durability settings for [`crate::SqliteStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteStoreConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
    /// Milliseconds SQLite waits on a locked database before giving up.
    pub busy_timeout_ms: u64,
    /// Journal mode.
    pub journal_mode: SqliteStoreMode,
    /// Synchronous mode.
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Builds a config pointed at `path` with the defaults this crate uses
    /// in production: WAL journaling, normal sync, a 5s busy timeout.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            busy_timeout_ms: 5_000,
            journal_mode: SqliteStoreMode::Wal,
            sync_mode: SqliteSyncMode::Normal,
        }
    }
}
