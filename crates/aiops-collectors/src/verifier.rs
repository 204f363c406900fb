// aiops-collectors/src/verifier.rs
// ============================================================================
// Module: Metrics Verifier (C6)
// Description: Re-samples post-action metrics and pod readiness, then
//              evaluates the §4.6 success predicate against a pre-action
//              snapshot the caller recorded at proposal time.
// Dependencies: aiops-core, crate::clients
// ============================================================================

//! ## Overview
//! [`MetricsVerifier`] is generic over [`crate::clients::MetricsBackendClient`]
//! and [`crate::clients::ClusterApiClient`], the same backend-agnostic seams
//! the collectors in [`crate::collectors`] are built against. A caller
//! records each action's pre-action error rate and latency via
//! [`MetricsVerifier::record_pre_action`] before dispatching it; `verify`
//! re-queries the backends afterward and compares.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;

use aiops_core::evaluate_metrics_improved;
use aiops_core::evaluate_success;
use aiops_core::ActionId;
use aiops_core::MetricName;
use aiops_core::RemediationAction;
use aiops_core::TimeWindow;
use aiops_core::VerificationId;
use aiops_core::VerificationMetrics;
use aiops_core::VerificationResult;
use aiops_core::Verifier;
use aiops_core::VerifierError;

use crate::clients::ClusterApiClient;
use crate::clients::MetricsBackendClient;

/// The §4.6 error-rate threshold `evaluate_success` compares against, absent
/// a configured override.
const DEFAULT_ERROR_RATE_THRESHOLD: f64 = 0.05;

/// The error rate and latency an action's proposer observed immediately
/// before dispatching it, needed to evaluate the §4.6 success predicate
/// once post-action metrics come back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreActionSnapshot {
    /// Error rate sampled before the action executed.
    pub error_rate: f64,
    /// p99 latency sampled before the action executed.
    pub latency: f64,
}

/// Verifies remediation actions by re-sampling the metrics and cluster
/// backends after execution and comparing against a recorded pre-action
/// snapshot (C6, §4.6).
pub struct MetricsVerifier<M, C> {
    /// Post-action metrics source.
    metrics: M,
    /// Post-action pod-readiness source.
    cluster: C,
    /// Window the post-action samples are queried over.
    verification_window: TimeWindow,
    /// The error-rate threshold `evaluate_success` is evaluated against.
    error_rate_threshold: f64,
    /// Pre-action snapshots recorded by the caller, keyed by action id.
    pre_action: Mutex<BTreeMap<ActionId, PreActionSnapshot>>,
}

impl<M: MetricsBackendClient, C: ClusterApiClient> MetricsVerifier<M, C> {
    /// Builds a verifier sampling over `verification_window`, using the
    /// default §4.6 error-rate threshold.
    #[must_use]
    pub fn new(metrics: M, cluster: C, verification_window: TimeWindow) -> Self {
        Self {
            metrics,
            cluster,
            verification_window,
            error_rate_threshold: DEFAULT_ERROR_RATE_THRESHOLD,
            pre_action: Mutex::new(BTreeMap::new()),
        }
    }

    /// Overrides the default error-rate threshold `evaluate_success` is
    /// evaluated against.
    #[must_use]
    pub fn with_error_rate_threshold(mut self, threshold: f64) -> Self {
        self.error_rate_threshold = threshold;
        self
    }

    /// Records `snapshot` as the pre-action metrics for `action_id`, to be
    /// compared against post-action metrics when [`Verifier::verify`] runs.
    pub fn record_pre_action(&self, action_id: ActionId, snapshot: PreActionSnapshot) {
        let mut guard = self.pre_action.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.insert(action_id, snapshot);
    }
}

impl<M: MetricsBackendClient, C: ClusterApiClient> Verifier for MetricsVerifier<M, C> {
    fn verify(&self, action: &RemediationAction) -> Result<VerificationResult, VerifierError> {
        let pre_action = {
            let guard = self.pre_action.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            guard.get(&action.id).copied()
        };
        let Some(pre_action) = pre_action else {
            return Err(VerifierError::Backend(format!(
                "no pre-action metrics snapshot recorded for action {}",
                action.id
            )));
        };

        let service = Some(action.target_resource.as_str());
        let error_rate_after = self
            .metrics
            .sample(&action.target_namespace, service, MetricName::Http5xxRate, self.verification_window)
            .map_err(|err| VerifierError::Backend(err.to_string()))?
            .value;
        let latency_after = self
            .metrics
            .sample(&action.target_namespace, service, MetricName::P99Latency, self.verification_window)
            .map_err(|err| VerifierError::Backend(err.to_string()))?
            .value;
        let restart_delta_sample = self
            .metrics
            .sample(&action.target_namespace, service, MetricName::RestartCountDelta, self.verification_window)
            .map_err(|err| VerifierError::Backend(err.to_string()))?
            .value;
        #[allow(clippy::cast_possible_truncation, reason = "restart deltas are small non-negative counts")]
        let restart_count_delta_post = restart_delta_sample.max(0.0) as u32;

        let pod_states = self
            .cluster
            .list_pod_states(&action.target_namespace, service)
            .map_err(|err| VerifierError::Backend(err.to_string()))?;
        let pods_ready_ratio = if pod_states.is_empty() {
            0.0
        } else {
            let ready_count = pod_states.iter().filter(|(_, state)| state.ready).count();
            ready_count as f64 / pod_states.len() as f64
        };

        let metrics = VerificationMetrics {
            error_rate_before: pre_action.error_rate,
            error_rate_after,
            latency_before: pre_action.latency,
            latency_after,
            restart_count_delta_post,
            pods_ready_ratio,
        };
        let success = evaluate_success(metrics, self.error_rate_threshold);
        let metrics_improved = evaluate_metrics_improved(metrics);
        tracing::info!(action_id = %action.id, success, metrics_improved, "verification complete");

        Ok(VerificationResult {
            id: VerificationId::new(format!("verify:{}", action.id.as_str())),
            action_id: action.id.clone(),
            success,
            metrics_improved,
            metrics,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test setup only")]
mod tests {
    use std::collections::BTreeMap;
    use std::collections::BTreeSet;

    use aiops_core::ActionId;
    use aiops_core::ActionStatus;
    use aiops_core::ActionType;
    use aiops_core::ClusterEventReason;
    use aiops_core::CollectorError;
    use aiops_core::HpaStateData;
    use aiops_core::IdempotencyKey;
    use aiops_core::IncidentId;
    use aiops_core::MetricName;
    use aiops_core::MetricSampleData;
    use aiops_core::NodeStateData;
    use aiops_core::PodStateData;
    use aiops_core::RemediationAction;
    use aiops_core::RiskLevel;
    use aiops_core::TimeWindow;
    use aiops_core::Timestamp;
    use aiops_core::Verifier;
    use aiops_core::VerifierError;

    use super::MetricsVerifier;
    use super::PreActionSnapshot;
    use crate::clients::ClusterApiClient;
    use crate::clients::MetricsBackendClient;

    struct StubMetrics {
        error_rate: f64,
        latency: f64,
        restart_delta: f64,
    }

    impl MetricsBackendClient for StubMetrics {
        fn sample(
            &self,
            _namespace: &str,
            _service: Option<&str>,
            metric: MetricName,
            _window: TimeWindow,
        ) -> Result<MetricSampleData, CollectorError> {
            let value = match metric {
                MetricName::Http5xxRate => self.error_rate,
                MetricName::P99Latency => self.latency,
                MetricName::RestartCountDelta => self.restart_delta,
                _ => 0.0,
            };
            Ok(MetricSampleData { metric, value })
        }
    }

    struct StubCluster {
        ready_pods: usize,
        total_pods: usize,
    }

    impl ClusterApiClient for StubCluster {
        fn list_pod_states(
            &self,
            _namespace: &str,
            _service: Option<&str>,
        ) -> Result<Vec<(String, PodStateData)>, CollectorError> {
            Ok((0..self.total_pods)
                .map(|index| {
                    (
                        format!("pod-{index}"),
                        PodStateData {
                            waiting_reasons: BTreeSet::new(),
                            terminated_reasons: BTreeSet::new(),
                            restart_count: 0,
                            ready: index < self.ready_pods,
                        },
                    )
                })
                .collect())
        }

        fn list_node_states(&self, _namespace: &str) -> Result<Vec<(String, NodeStateData)>, CollectorError> {
            Ok(Vec::new())
        }

        fn hpa_state(
            &self,
            _namespace: &str,
            _service: Option<&str>,
        ) -> Result<Option<HpaStateData>, CollectorError> {
            Ok(None)
        }

        fn list_events(&self, _namespace: &str) -> Result<Vec<ClusterEventReason>, CollectorError> {
            Ok(Vec::new())
        }
    }

    fn sample_action() -> RemediationAction {
        RemediationAction {
            id: ActionId::new("action-1"),
            incident_id: IncidentId::new("inc-1"),
            hypothesis_id: None,
            idempotency_key: IdempotencyKey::new("key-1"),
            action_type: ActionType::RestartPod,
            target_resource: "checkout-7f".to_owned(),
            target_namespace: "payments".to_owned(),
            parameters: BTreeMap::new(),
            risk_level: RiskLevel::Low,
            blast_radius_score: 10.0,
            status: ActionStatus::Succeeded,
            requires_approval: false,
            approved_by: None,
            approved_at: None,
            executed_at: Some(Timestamp::Logical(1)),
            completed_at: Some(Timestamp::Logical(2)),
            execution_result: None,
        }
    }

    fn window() -> TimeWindow {
        TimeWindow { start: Timestamp::Logical(1), end: Timestamp::Logical(2) }
    }

    #[test]
    fn verify_fails_closed_without_a_recorded_pre_action_snapshot() {
        let verifier = MetricsVerifier::new(
            StubMetrics { error_rate: 0.01, latency: 100.0, restart_delta: 0.0 },
            StubCluster { ready_pods: 3, total_pods: 3 },
            window(),
        );
        let err = verifier.verify(&sample_action()).unwrap_err();
        assert!(matches!(err, VerifierError::Backend(_)));
    }

    #[test]
    fn an_improved_and_healthy_action_verifies_as_successful() {
        let verifier = MetricsVerifier::new(
            StubMetrics { error_rate: 0.01, latency: 100.0, restart_delta: 0.0 },
            StubCluster { ready_pods: 3, total_pods: 3 },
            window(),
        );
        verifier.record_pre_action(ActionId::new("action-1"), PreActionSnapshot { error_rate: 0.20, latency: 500.0 });
        let result = verifier.verify(&sample_action()).unwrap();
        assert!(result.success);
        assert!(result.metrics_improved);
        assert_eq!(result.metrics.pods_ready_ratio, 1.0);
    }

    #[test]
    fn unready_pods_fail_the_success_threshold_despite_improved_error_rate() {
        let verifier = MetricsVerifier::new(
            StubMetrics { error_rate: 0.01, latency: 100.0, restart_delta: 0.0 },
            StubCluster { ready_pods: 1, total_pods: 4 },
            window(),
        );
        verifier.record_pre_action(ActionId::new("action-1"), PreActionSnapshot { error_rate: 0.20, latency: 500.0 });
        let result = verifier.verify(&sample_action()).unwrap();
        assert!(!result.success);
        assert!(result.metrics_improved);
    }
}
