// aiops-collectors/src/collectors.rs
// ============================================================================
// Module: Evidence Collectors
// Description: The four built-in collector variants (cluster-state, logs,
//              metrics, deploy-diff) implementing `EvidenceCollector` (§4.2).
// Purpose: Turn a backend client's raw query results into typed `Evidence`
//          records with an assigned `signal_strength`, never failing the
//          whole collection pass on a partial backend failure.
// Dependencies: aiops-core, crate::clients
// ============================================================================

//! ## Overview
//! Each collector here wraps one [`crate::clients`] trait and produces one
//! or more [`Evidence`] records per call. Per §4.2/§7's propagation policy,
//! a collector swallows its own per-entity backend errors and reports
//! whatever it gathered with `partial = true` rather than failing the whole
//! call; [`CollectorError`] is reserved for the case where nothing at all
//! could be produced.

// ============================================================================
// SECTION: Imports
// ============================================================================

use aiops_core::CollectionContext;
use aiops_core::CollectorError;
use aiops_core::Evidence;
use aiops_core::EvidenceCollector;
use aiops_core::EvidenceData;
use aiops_core::EvidenceId;
use aiops_core::EvidenceSource;
use aiops_core::MetricName;
use smallvec::SmallVec;

use crate::clients::ClusterApiClient;
use crate::clients::DeployHistoryClient;
use crate::clients::LogBackendClient;
use crate::clients::MetricsBackendClient;

/// Default signal strength assigned to a cleanly collected record (§4.2's
/// rubric: full confidence when the backend answered within its deadline).
const FULL_SIGNAL_STRENGTH: f64 = 1.0;
/// Signal strength assigned to evidence collected under a partial failure.
const PARTIAL_SIGNAL_STRENGTH: f64 = 0.4;

fn evidence_id(ctx: &CollectionContext, suffix: &str) -> EvidenceId {
    EvidenceId::new(format!("{}:{suffix}", ctx.incident_id))
}

// ============================================================================
// SECTION: Cluster State Collector
// ============================================================================

/// Collects pod, node, HPA, and event state from the cluster API (§4.2,
/// §6).
pub struct ClusterStateCollector<C> {
    client: C,
}

impl<C> ClusterStateCollector<C> {
    /// Builds a collector over `client`.
    pub const fn new(client: C) -> Self {
        Self { client }
    }
}

impl<C: ClusterApiClient> EvidenceCollector for ClusterStateCollector<C> {
    fn name(&self) -> &str {
        "cluster-state"
    }

    fn collect(&self, ctx: &CollectionContext) -> Result<Vec<Evidence>, CollectorError> {
        let mut evidence: SmallVec<[Evidence; 4]> = SmallVec::new();
        let mut any_failure = false;

        match self.client.list_pod_states(&ctx.namespace, ctx.service.as_deref()) {
            Ok(pods) => {
                for (pod_name, data) in pods {
                    evidence.push(Evidence {
                        id: evidence_id(ctx, &format!("pod:{pod_name}")),
                        incident_id: ctx.incident_id.clone(),
                        source: EvidenceSource::K8s,
                        entity_name: pod_name,
                        entity_namespace: ctx.namespace.clone(),
                        data: EvidenceData::PodState(data),
                        signal_strength: FULL_SIGNAL_STRENGTH,
                        collected_at: ctx.time_window.end,
                        time_window: ctx.time_window,
                        partial: false,
                    });
                }
            }
            Err(CollectorError::Backend { .. }) => any_failure = true,
            Err(timeout @ CollectorError::Timeout { .. }) => return Err(timeout),
        }

        match self.client.list_node_states(&ctx.namespace) {
            Ok(nodes) => {
                for (node_name, data) in nodes {
                    evidence.push(Evidence {
                        id: evidence_id(ctx, &format!("node:{node_name}")),
                        incident_id: ctx.incident_id.clone(),
                        source: EvidenceSource::K8s,
                        entity_name: node_name,
                        entity_namespace: ctx.namespace.clone(),
                        data: EvidenceData::NodeState(data),
                        signal_strength: FULL_SIGNAL_STRENGTH,
                        collected_at: ctx.time_window.end,
                        time_window: ctx.time_window,
                        partial: false,
                    });
                }
            }
            Err(CollectorError::Backend { .. }) => any_failure = true,
            Err(timeout @ CollectorError::Timeout { .. }) => return Err(timeout),
        }

        match self.client.hpa_state(&ctx.namespace, ctx.service.as_deref()) {
            Ok(Some(data)) => evidence.push(Evidence {
                id: evidence_id(ctx, "hpa"),
                incident_id: ctx.incident_id.clone(),
                source: EvidenceSource::K8s,
                entity_name: ctx.service.clone().unwrap_or_default(),
                entity_namespace: ctx.namespace.clone(),
                data: EvidenceData::HpaState(data),
                signal_strength: FULL_SIGNAL_STRENGTH,
                collected_at: ctx.time_window.end,
                time_window: ctx.time_window,
                partial: false,
            }),
            Ok(None) => {}
            Err(CollectorError::Backend { .. }) => any_failure = true,
            Err(timeout @ CollectorError::Timeout { .. }) => return Err(timeout),
        }

        match self.client.list_events(&ctx.namespace) {
            Ok(reasons) if !reasons.is_empty() => evidence.push(Evidence {
                id: evidence_id(ctx, "events"),
                incident_id: ctx.incident_id.clone(),
                source: EvidenceSource::K8s,
                entity_name: ctx.namespace.clone(),
                entity_namespace: ctx.namespace.clone(),
                data: EvidenceData::Events(reasons.into_iter().collect()),
                signal_strength: FULL_SIGNAL_STRENGTH,
                collected_at: ctx.time_window.end,
                time_window: ctx.time_window,
                partial: false,
            }),
            Ok(_) => {}
            Err(CollectorError::Backend { .. }) => any_failure = true,
            Err(timeout @ CollectorError::Timeout { .. }) => return Err(timeout),
        }

        if evidence.is_empty() && any_failure {
            tracing::warn!(incident_id = %ctx.incident_id, "all cluster-state sub-queries failed");
            return Err(CollectorError::Backend {
                collector: self.name().to_owned(),
                message: "all cluster-state sub-queries failed".to_owned(),
            });
        }
        if any_failure {
            tracing::debug!(incident_id = %ctx.incident_id, "cluster-state collection partially failed");
            for item in &mut evidence {
                item.partial = true;
                item.signal_strength = PARTIAL_SIGNAL_STRENGTH;
            }
        }
        Ok(evidence.into_vec())
    }
}

// ============================================================================
// SECTION: Logs Collector
// ============================================================================

/// Collects log line pattern match counts (§4.2, §6).
pub struct LogsCollector<C> {
    client: C,
}

impl<C> LogsCollector<C> {
    /// Builds a collector over `client`.
    pub const fn new(client: C) -> Self {
        Self { client }
    }
}

impl<C: LogBackendClient> EvidenceCollector for LogsCollector<C> {
    fn name(&self) -> &str {
        "logs"
    }

    fn collect(&self, ctx: &CollectionContext) -> Result<Vec<Evidence>, CollectorError> {
        let data = self.client.query_patterns(&ctx.namespace, ctx.service.as_deref(), ctx.time_window)?;
        Ok(vec![Evidence {
            id: evidence_id(ctx, "logs"),
            incident_id: ctx.incident_id.clone(),
            source: EvidenceSource::Logs,
            entity_name: ctx.service.clone().unwrap_or_default(),
            entity_namespace: ctx.namespace.clone(),
            data: EvidenceData::LogsPattern(data),
            signal_strength: FULL_SIGNAL_STRENGTH,
            collected_at: ctx.time_window.end,
            time_window: ctx.time_window,
            partial: false,
        }])
    }
}

// ============================================================================
// SECTION: Metrics Collector
// ============================================================================

/// The fixed metric set the metrics collector samples every call (§4.3's
/// signal names).
const METRICS_TO_SAMPLE: [MetricName; 6] = [
    MetricName::RestartCountDelta,
    MetricName::MemoryUsageRatio,
    MetricName::CpuThrottleRate,
    MetricName::Http5xxRate,
    MetricName::P99Latency,
    MetricName::HpaUtilization,
];

/// Collects instant PromQL-family metric samples (§4.2, §6).
pub struct MetricsCollector<C> {
    client: C,
}

impl<C> MetricsCollector<C> {
    /// Builds a collector over `client`.
    pub const fn new(client: C) -> Self {
        Self { client }
    }
}

impl<C: MetricsBackendClient> EvidenceCollector for MetricsCollector<C> {
    fn name(&self) -> &str {
        "metrics"
    }

    fn collect(&self, ctx: &CollectionContext) -> Result<Vec<Evidence>, CollectorError> {
        let mut evidence: SmallVec<[Evidence; 4]> = SmallVec::new();
        let mut failures = 0usize;

        for metric in METRICS_TO_SAMPLE {
            match self.client.sample(&ctx.namespace, ctx.service.as_deref(), metric, ctx.time_window) {
                Ok(data) => evidence.push(Evidence {
                    id: evidence_id(ctx, &format!("metric:{metric:?}")),
                    incident_id: ctx.incident_id.clone(),
                    source: EvidenceSource::Metrics,
                    entity_name: ctx.service.clone().unwrap_or_default(),
                    entity_namespace: ctx.namespace.clone(),
                    data: EvidenceData::MetricSample(data),
                    signal_strength: FULL_SIGNAL_STRENGTH,
                    collected_at: ctx.time_window.end,
                    time_window: ctx.time_window,
                    partial: false,
                }),
                Err(CollectorError::Backend { .. }) => failures += 1,
                Err(timeout @ CollectorError::Timeout { .. }) => return Err(timeout),
            }
        }

        if evidence.is_empty() && failures > 0 {
            tracing::warn!(incident_id = %ctx.incident_id, "all metric samples failed");
            return Err(CollectorError::Backend {
                collector: self.name().to_owned(),
                message: "all metric samples failed".to_owned(),
            });
        }
        if failures > 0 {
            tracing::debug!(incident_id = %ctx.incident_id, failures, "metrics collection partially failed");
            for item in &mut evidence {
                item.partial = true;
                item.signal_strength = PARTIAL_SIGNAL_STRENGTH;
            }
        }
        Ok(evidence.into_vec())
    }
}

// ============================================================================
// SECTION: Deploy Diff Collector
// ============================================================================

/// Collects rollout/deploy-history diffs (§4.2, §6).
pub struct DeployDiffCollector<C> {
    client: C,
    lookback_ms: u64,
}

impl<C> DeployDiffCollector<C> {
    /// Builds a collector over `client`, looking back `lookback_ms`
    /// milliseconds for rollout history (§10.3's `deploy_lookback`).
    pub const fn new(client: C, lookback_ms: u64) -> Self {
        Self { client, lookback_ms }
    }
}

impl<C: DeployHistoryClient> EvidenceCollector for DeployDiffCollector<C> {
    fn name(&self) -> &str {
        "deploy-diff"
    }

    fn collect(&self, ctx: &CollectionContext) -> Result<Vec<Evidence>, CollectorError> {
        let Some(service) = ctx.service.as_deref() else {
            return Ok(Vec::new());
        };
        let data = self.client.deploy_history(&ctx.namespace, service, self.lookback_ms)?;
        Ok(vec![Evidence {
            id: evidence_id(ctx, "deploy-history"),
            incident_id: ctx.incident_id.clone(),
            source: EvidenceSource::Deploy,
            entity_name: service.to_owned(),
            entity_namespace: ctx.namespace.clone(),
            data: EvidenceData::DeployHistory(data),
            signal_strength: FULL_SIGNAL_STRENGTH,
            collected_at: ctx.time_window.end,
            time_window: ctx.time_window,
            partial: false,
        }])
    }
}
