// aiops-core/src/interfaces/mod.rs
// ============================================================================
// Module: Incident Pipeline Interfaces
// Description: Backend-agnostic trait seams for evidence collection, the
//              evidence graph, remediation execution, verification,
//              approval, and durable workflow storage.
// Purpose: Let the workflow driver (C7) and rules/policy logic (C3/C4)
//          integrate with external systems (cluster API, log/metrics
//          backends, SQLite store, approval transport) without depending on
//          any concrete backend.
// Dependencies: thiserror, crate::core
// ============================================================================

//! ## Overview
//! Every external collaborator the pipeline depends on — evidence sources,
//! the graph store, action backends, the verifier's metrics source, the
//! approval transport, and the durable run-state store — is reached through
//! a trait defined here, never a concrete type. Implementations must be
//! deterministic where the spec requires it (the graph store's upsert
//! convergence, §4.1) and fail closed on missing or invalid data (the rules
//! engine only ever sees `Unknown`, never a silently substituted default,
//! when a collector or backend cannot answer).

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::evidence::Evidence;
use crate::core::evidence::TimeWindow;
use crate::core::graph::EntityAttributes;
use crate::core::graph::EntityKey;
use crate::core::graph::RelationKind;
use crate::core::graph::Subgraph;
use crate::core::identifiers::ActionId;
use crate::core::identifiers::ClusterId;
use crate::core::identifiers::IncidentId;
use crate::core::identifiers::NodeId;
use crate::core::identifiers::VerificationId;
use crate::core::incident::Incident;
use crate::core::remediation::ExecutionResult;
use crate::core::remediation::RemediationAction;
use crate::core::time::Timestamp;
use crate::core::verification::VerificationResult;

// ============================================================================
// SECTION: Evidence Collector
// ============================================================================

/// Context an evidence collector needs to scope its query (§4.2).
///
/// # Invariants
/// - `time_window` bounds the query; collectors must not look outside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionContext {
    /// The incident being investigated.
    pub incident_id: IncidentId,
    /// The cluster to query.
    pub cluster: ClusterId,
    /// The namespace to query.
    pub namespace: String,
    /// The service selector, if the incident named one.
    pub service: Option<String>,
    /// The time window to collect over.
    pub time_window: TimeWindow,
}

/// Evidence collector errors (§7 "Transient upstream" / "Permanent
/// upstream").
#[derive(Debug, Error)]
pub enum CollectorError {
    /// The collector's deadline elapsed before it could finish; callers
    /// should fall back to whatever partial evidence was gathered rather
    /// than treat this as fatal.
    #[error("collector {collector} timed out after {elapsed_ms}ms")]
    Timeout {
        /// The collector that timed out.
        collector: String,
        /// Milliseconds elapsed before the deadline fired.
        elapsed_ms: u64,
    },
    /// The upstream backend returned a permanent error (not retried).
    #[error("collector {collector} backend error: {message}")]
    Backend {
        /// The collector reporting the error.
        collector: String,
        /// Free-form backend error detail.
        message: String,
    },
}

/// A source of evidence, polymorphic over the capability set `{collect}`
/// (§4.2, §9 "Plugin collectors"). Each collector variant (cluster-state,
/// logs, metrics, deploy-diff) implements this trait and is registered in a
/// name-keyed registry with an allowlist/denylist access policy.
pub trait EvidenceCollector {
    /// The registry key this collector is identified by (e.g.
    /// `"cluster-state"`, `"logs"`).
    fn name(&self) -> &str;

    /// Collects evidence for `ctx`, returning whatever was gathered before
    /// the collector's own deadline. A collector that can only gather part
    /// of its evidence before timing out should return that partial
    /// evidence with [`Evidence::partial`](crate::core::evidence::Evidence)
    /// set, not an error — [`CollectorError::Timeout`] is reserved for a
    /// total failure to produce anything.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError`] when the collector produced nothing at
    /// all before its deadline or hit a permanent backend error.
    fn collect(&self, ctx: &CollectionContext) -> Result<Vec<Evidence>, CollectorError>;
}

/// Collector registry errors: failing closed when a scenario references a
/// collector that is not registered or has been denied (§4.2).
#[derive(Debug, Error)]
pub enum CollectorRegistryError {
    /// The named collector is not registered.
    #[error("collector not registered: {0}")]
    NotRegistered(String),
    /// The named collector is registered but denied by access policy.
    #[error("collector denied by policy: {0}")]
    Denied(String),
}

// ============================================================================
// SECTION: Evidence Graph Store
// ============================================================================

/// Evidence graph store errors (C1).
#[derive(Debug, Error)]
pub enum GraphStoreError {
    /// Store I/O error.
    #[error("graph store io error: {0}")]
    Io(String),
    /// The requested `depth` exceeds [`crate::core::graph::MAX_SUBGRAPH_DEPTH`].
    #[error("subgraph depth {requested} exceeds maximum {max}")]
    DepthExceeded {
        /// The depth that was requested.
        requested: u8,
        /// The maximum allowed depth.
        max: u8,
    },
    /// Store data failed validation.
    #[error("graph store invalid data: {0}")]
    Invalid(String),
}

/// The typed evidence graph store (C1, §4.1). Upserts are idempotent on the
/// entity key or edge endpoints+relation; concurrent upserts of the same key
/// converge to a single node with merged attributes (scalar last-writer-wins,
/// set union) — see [`crate::core::graph::merge_attributes`].
pub trait GraphStore {
    /// Upserts an entity node, merging `attrs` into any existing node at the
    /// same key, and returns the resulting node id.
    ///
    /// # Errors
    ///
    /// Returns [`GraphStoreError`] when the upsert fails.
    fn upsert_entity(&self, key: EntityKey, attrs: EntityAttributes) -> Result<NodeId, GraphStoreError>;

    /// Links an incident to an entity with `relation`, idempotent on
    /// `(incident_id, entity_id, relation)`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphStoreError`] when the link fails.
    fn link_incident_to_entity(
        &self,
        incident_id: &IncidentId,
        entity_id: &NodeId,
        relation: RelationKind,
    ) -> Result<(), GraphStoreError>;

    /// Appends an evidence node and an `ABOUT` edge to the entity it
    /// concerns.
    ///
    /// # Errors
    ///
    /// Returns [`GraphStoreError`] when the append fails.
    fn attach_evidence(&self, incident_id: &IncidentId, evidence: &Evidence) -> Result<(), GraphStoreError>;

    /// Returns the bounded subgraph reachable from `incident_id` within
    /// `depth` hops (`depth` must be `<= `[`crate::core::graph::MAX_SUBGRAPH_DEPTH`]).
    ///
    /// # Errors
    ///
    /// Returns [`GraphStoreError::DepthExceeded`] if `depth` is out of
    /// range, or another [`GraphStoreError`] variant on store failure.
    fn subgraph(&self, incident_id: &IncidentId, depth: u8) -> Result<Subgraph, GraphStoreError>;
}

// ============================================================================
// SECTION: Remediation Executor (Action Backend)
// ============================================================================

/// Remediation executor errors (C5, §4.5, §7).
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The target resource did not exist.
    #[error("target not found: {0}")]
    NotFound(String),
    /// The executor lacked permission to act.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// A transient backend error occurred; callers may retry per §4.5's
    /// bounded backoff.
    #[error("transient backend error: {0}")]
    Transient(String),
    /// The action's deadline elapsed.
    #[error("execution timed out after {elapsed_ms}ms")]
    Timeout {
        /// Milliseconds elapsed before the deadline fired.
        elapsed_ms: u64,
    },
}

/// A remediation action backend, keyed by a URI-style target scheme
/// (mirroring the evidence collector registry's keyed-registry shape, §4.5),
/// so new cluster backends can be added without touching the workflow or
/// the idempotency/retry wrapper around them.
pub trait ActionBackend {
    /// The URI-style scheme this backend handles (e.g. `"k8s"`).
    fn scheme(&self) -> &str;

    /// Executes `action` against the backend. Implementations perform the
    /// single underlying mutation; idempotency-key caching and retry/backoff
    /// are the caller's responsibility (the workflow wraps this call).
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] when the action cannot be executed.
    fn execute(&self, action: &RemediationAction) -> Result<ExecutionResult, ExecutorError>;
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Verifier errors (C6).
#[derive(Debug, Error)]
pub enum VerifierError {
    /// The metrics backend could not be queried.
    #[error("metrics backend error: {0}")]
    Backend(String),
}

/// Compares pre/post metrics after a remediation action executes (C6,
/// §4.6).
pub trait Verifier {
    /// Verifies `action`, given its pre-action metrics snapshot was already
    /// captured at proposal time; the verifier re-queries post-action
    /// metrics and evaluates the §4.6 success predicate.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError`] when the post-action metrics query fails.
    fn verify(&self, action: &RemediationAction) -> Result<VerificationResult, VerifierError>;
}

// ============================================================================
// SECTION: Approval Channel
// ============================================================================

/// The outcome of an approval request (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalOutcome {
    /// The action was approved.
    Approved,
    /// The action was denied.
    Denied,
    /// No response arrived before the deadline.
    TimedOut,
}

/// Approval channel errors.
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// The approval transport reported an error.
    #[error("approval channel error: {0}")]
    Transport(String),
}

/// An out-of-band approval transport (§6). The specific transport (Slack,
/// email, a web form) is pluggable; the workflow requires only this
/// synchronous-appearing request/response contract.
pub trait ApprovalChannel {
    /// Requests approval for `action`, described by `action_summary`, with
    /// responses accepted until `deadline`.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError`] when the request cannot be sent.
    fn request(
        &self,
        action_id: &ActionId,
        action_summary: &str,
        deadline: Timestamp,
    ) -> Result<ApprovalOutcome, ApprovalError>;
}

// ============================================================================
// SECTION: Workflow Store
// ============================================================================

/// Durable workflow store errors (C7).
#[derive(Debug, Error)]
pub enum WorkflowStoreError {
    /// Store I/O error.
    #[error("workflow store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("workflow store corruption: {0}")]
    Corrupt(String),
    /// Store data is invalid.
    #[error("workflow store invalid data: {0}")]
    Invalid(String),
}

/// The durable store backing the incident workflow's event journal (C7,
/// §4.7). Every state transition and activity result is journaled here
/// before being observed by downstream steps, so that a crash-restart can
/// resume from the last journaled point.
pub trait WorkflowStore {
    /// Appends `event` (serialized by the caller) to `incident_id`'s
    /// journal.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowStoreError`] when the append fails.
    fn append_event(&self, incident_id: &IncidentId, event_json: &str) -> Result<(), WorkflowStoreError>;

    /// Loads the full event journal for `incident_id`, in append order.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowStoreError`] when loading fails.
    fn load_journal(&self, incident_id: &IncidentId) -> Result<Vec<String>, WorkflowStoreError>;

    /// Loads the current materialized incident record, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowStoreError`] when loading fails.
    fn load_incident(&self, incident_id: &IncidentId) -> Result<Option<Incident>, WorkflowStoreError>;

    /// Persists the current materialized incident record.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowStoreError`] when saving fails.
    fn save_incident(&self, incident: &Incident) -> Result<(), WorkflowStoreError>;

    /// Loads a cached execution result for `idempotency_key`, if a
    /// remediation action with that key has already been executed.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowStoreError`] when loading fails.
    fn load_action_by_idempotency_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<RemediationAction>, WorkflowStoreError>;

    /// Persists a remediation action record (insert or update).
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowStoreError`] when saving fails.
    fn save_action(&self, action: &RemediationAction) -> Result<(), WorkflowStoreError>;

    /// Persists a verification result, keyed by its own identifier.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowStoreError`] when saving fails.
    fn save_verification(
        &self,
        verification_id: &VerificationId,
        result: &VerificationResult,
    ) -> Result<(), WorkflowStoreError>;

    /// Reports store readiness for liveness/readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowStoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), WorkflowStoreError> {
        Ok(())
    }
}

impl<T: WorkflowStore> WorkflowStore for &T {
    fn append_event(&self, incident_id: &IncidentId, event_json: &str) -> Result<(), WorkflowStoreError> {
        (**self).append_event(incident_id, event_json)
    }

    fn load_journal(&self, incident_id: &IncidentId) -> Result<Vec<String>, WorkflowStoreError> {
        (**self).load_journal(incident_id)
    }

    fn load_incident(&self, incident_id: &IncidentId) -> Result<Option<Incident>, WorkflowStoreError> {
        (**self).load_incident(incident_id)
    }

    fn save_incident(&self, incident: &Incident) -> Result<(), WorkflowStoreError> {
        (**self).save_incident(incident)
    }

    fn load_action_by_idempotency_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<RemediationAction>, WorkflowStoreError> {
        (**self).load_action_by_idempotency_key(idempotency_key)
    }

    fn save_action(&self, action: &RemediationAction) -> Result<(), WorkflowStoreError> {
        (**self).save_action(action)
    }

    fn save_verification(
        &self,
        verification_id: &VerificationId,
        result: &VerificationResult,
    ) -> Result<(), WorkflowStoreError> {
        (**self).save_verification(verification_id, result)
    }

    fn readiness(&self) -> Result<(), WorkflowStoreError> {
        (**self).readiness()
    }
}
