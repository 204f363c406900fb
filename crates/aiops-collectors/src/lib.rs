// aiops-collectors/src/lib.rs
// ============================================================================
// Module: AIOps Collectors Library
// Description: Evidence collector implementations and registry (C2).
// Purpose: Turn cluster/log/metrics/deploy backend state into typed
//          `aiops_core::Evidence` records, backend-agnostic over concrete
//          client wiring.
// Dependencies: aiops-core, smallvec, thiserror, tracing
// ============================================================================

//! ## Overview
//! `aiops-collectors` implements the evidence collection stage of the
//! incident pipeline (§4.2) and the verification stage (C6, §4.6). Each
//! collector variant ([`ClusterStateCollector`], [`LogsCollector`],
//! [`MetricsCollector`], [`DeployDiffCollector`]) is generic over one of the
//! narrow backend-client traits in [`clients`], and
//! [`registry::CollectorRegistry`] routes collection by registry key with
//! allowlist/denylist enforcement, the same shape [`aiops_core::interfaces`]
//! uses for every other backend seam in the pipeline. [`MetricsVerifier`]
//! reuses the same [`clients::MetricsBackendClient`]/[`clients::ClusterApiClient`]
//! seams to re-sample metrics after a remediation action executes.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod clients;
pub mod collectors;
pub mod registry;
pub mod verifier;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use clients::ClusterApiClient;
pub use clients::DeployHistoryClient;
pub use clients::LogBackendClient;
pub use clients::MetricsBackendClient;

pub use collectors::ClusterStateCollector;
pub use collectors::DeployDiffCollector;
pub use collectors::LogsCollector;
pub use collectors::MetricsCollector;

pub use registry::CollectionReport;
pub use registry::CollectorAccessPolicy;
pub use registry::CollectorDispatchError;
pub use registry::CollectorMissingError;
pub use registry::CollectorRegistry;

pub use verifier::MetricsVerifier;
pub use verifier::PreActionSnapshot;
