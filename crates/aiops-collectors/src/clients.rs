// aiops-collectors/src/clients.rs
// ============================================================================
// Module: Backend Client Seams
// Description: The narrow backend-query traits each concrete collector in
//              this crate is built against.
// Purpose: Keep collectors themselves free of any particular cluster API,
//          log, or metrics client library; a deployment supplies its own
//          implementation of these traits (e.g. backed by `kube` or a raw
//          HTTP client), wired in by `aiops-cli`/`aiops-dispatch`.
// Dependencies: aiops-core
// ============================================================================

//! ## Overview
//! Each collector in [`crate::collectors`] is generic over one of these
//! traits rather than depending on a concrete client crate, mirroring the
//! way [`aiops_core::interfaces`] keeps the pipeline itself backend-agnostic.
//! The cluster API client, log backend client, and metrics backend client
//! named in §6 are all represented this way; wiring a real `kube`/PromQL/log
//! client is left to whatever binary assembles the pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use aiops_core::ClusterEventReason;
use aiops_core::CollectorError;
use aiops_core::DeployHistoryData;
use aiops_core::HpaStateData;
use aiops_core::LogsPatternData;
use aiops_core::MetricName;
use aiops_core::MetricSampleData;
use aiops_core::NodeStateData;
use aiops_core::PodStateData;
use aiops_core::TimeWindow;

// ============================================================================
// SECTION: Cluster API
// ============================================================================

/// The read subset of the cluster API the cluster-state collector needs
/// (§6's "list pods/deployments/replicasets/nodes/events/hpas").
pub trait ClusterApiClient {
    /// Lists pod state for every pod matching `namespace`/`service`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError`] on a backend failure.
    fn list_pod_states(
        &self,
        namespace: &str,
        service: Option<&str>,
    ) -> Result<Vec<(String, PodStateData)>, CollectorError>;

    /// Lists node state for every node carrying a pod in `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError`] on a backend failure.
    fn list_node_states(&self, namespace: &str) -> Result<Vec<(String, NodeStateData)>, CollectorError>;

    /// Returns the HPA state for `service` in `namespace`, if one targets it.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError`] on a backend failure.
    fn hpa_state(
        &self,
        namespace: &str,
        service: Option<&str>,
    ) -> Result<Option<HpaStateData>, CollectorError>;

    /// Lists recent cluster events scoped to `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError`] on a backend failure.
    fn list_events(&self, namespace: &str) -> Result<Vec<ClusterEventReason>, CollectorError>;
}

// ============================================================================
// SECTION: Log Backend
// ============================================================================

/// The log backend's range-query contract (§6: `(namespace, service,
/// time_window) -> line stream`).
pub trait LogBackendClient {
    /// Queries matched line patterns over `window`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError`] on a backend failure.
    fn query_patterns(
        &self,
        namespace: &str,
        service: Option<&str>,
        window: TimeWindow,
    ) -> Result<LogsPatternData, CollectorError>;
}

// ============================================================================
// SECTION: Metrics Backend
// ============================================================================

/// The metrics backend's instant/range PromQL-family query contract (§6).
pub trait MetricsBackendClient {
    /// Samples `metric` for `namespace`/`service` at the end of `window`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError`] on a backend failure.
    fn sample(
        &self,
        namespace: &str,
        service: Option<&str>,
        metric: MetricName,
        window: TimeWindow,
    ) -> Result<MetricSampleData, CollectorError>;
}

// ============================================================================
// SECTION: Deploy History
// ============================================================================

/// The rollout-history query contract backing the deploy-diff collector.
pub trait DeployHistoryClient {
    /// Returns the deploy-history diff for `service` in `namespace`, looking
    /// back `lookback_ms` milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError`] on a backend failure.
    fn deploy_history(
        &self,
        namespace: &str,
        service: &str,
        lookback_ms: u64,
    ) -> Result<DeployHistoryData, CollectorError>;
}
