// aiops-store-sqlite/src/lib.rs
// ============================================================================
// Module: AIOps SQLite Store Library
// Description: SQLite-backed evidence graph store (C1), workflow store
//              (C7), and approval channel (§6), sharing one database file.
// Dependencies: rusqlite, serde, serde_json, thiserror, tracing, aiops-core
// ============================================================================

//! ## Overview
//! `aiops-store-sqlite` gives the incident pipeline its only stateful
//! backend: one SQLite file, opened by [`SqliteStore::open`], implementing
//! [`aiops_core::GraphStore`], [`aiops_core::WorkflowStore`], and
//! [`aiops_core::ApprovalChannel`] against the tables
//! [`connection::initialize_schema`] creates. Every access goes through a
//! single `Mutex<rusqlite::Connection>` rather than a writer-queue/read-pool
//! architecture, appropriate to this pipeline's single-executor,
//! single-CLI-invocation concurrency model (§5).

// ============================================================================
// SECTION: Modules
// ============================================================================

mod approval;
mod config;
mod connection;
mod error;
mod graph_store;
mod store;
mod workflow_store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::SqliteStoreConfig;
pub use config::SqliteStoreMode;
pub use config::SqliteSyncMode;
pub use error::SqliteStoreError;
pub use store::SqliteStore;
