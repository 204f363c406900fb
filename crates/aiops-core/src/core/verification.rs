// aiops-core/src/core/verification.rs
// ============================================================================
// Module: Verification Result
// Description: Post-execution verification records produced by C6.
// Purpose: Canonical verification record and the success predicate from §4.6.
// Dependencies: serde, crate::core::identifiers
// ============================================================================

//! ## Overview
//! After an action executes, the verifier (C6) waits `verification_delay`
//! then re-queries metrics, comparing before/after values. Verification is
//! advisory: a failed verification marks the action `unverified` and the
//! workflow (C7) decides whether to retry based on its retry budget (§4.6).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ActionId;
use crate::core::identifiers::VerificationId;

// ============================================================================
// SECTION: Verification Result
// ============================================================================

/// The metrics snapshot compared before and after an action executes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerificationMetrics {
    /// Error rate sampled before the action executed.
    pub error_rate_before: f64,
    /// Error rate sampled after `verification_delay`.
    pub error_rate_after: f64,
    /// p99 latency sampled before the action executed.
    pub latency_before: f64,
    /// p99 latency sampled after `verification_delay`.
    pub latency_after: f64,
    /// Restart count delta observed in the post-action window.
    pub restart_count_delta_post: u32,
    /// Fraction of target pods reporting ready post-action.
    pub pods_ready_ratio: f64,
}

/// The outcome of verifying a remediation action (§4.6).
///
/// # Invariants
/// - `success` is computed by [`evaluate_success`] from `metrics` and the
///   configured error-rate threshold; it is never set independently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Verification record identifier.
    pub id: VerificationId,
    /// The action this verification is tied to.
    pub action_id: ActionId,
    /// Whether the action is judged to have resolved the incident.
    pub success: bool,
    /// Whether post-action metrics show measurable improvement, independent
    /// of the `success` threshold judgment.
    pub metrics_improved: bool,
    /// The compared metrics snapshot.
    pub metrics: VerificationMetrics,
}

/// Evaluates the §4.6 success predicate:
/// `(error_rate_after < error_rate_before * 0.5 OR error_rate_after < error_rate_threshold)
///  AND restart_count_delta_post == 0 AND pods_ready_ratio >= 0.9`.
#[must_use]
pub fn evaluate_success(metrics: VerificationMetrics, error_rate_threshold: f64) -> bool {
    let error_rate_improved = metrics.error_rate_after < metrics.error_rate_before * 0.5
        || metrics.error_rate_after < error_rate_threshold;
    error_rate_improved && metrics.restart_count_delta_post == 0 && metrics.pods_ready_ratio >= 0.9
}

/// Evaluates whether post-action metrics show measurable improvement over
/// pre-action metrics, regardless of whether the stricter `success`
/// threshold in [`evaluate_success`] is met.
#[must_use]
pub fn evaluate_metrics_improved(metrics: VerificationMetrics) -> bool {
    metrics.error_rate_after <= metrics.error_rate_before
        && metrics.latency_after <= metrics.latency_before
}

#[cfg(test)]
mod tests {
    use super::evaluate_metrics_improved;
    use super::evaluate_success;
    use super::VerificationMetrics;

    fn metrics(error_rate_after: f64, restart_delta: u32, ready_ratio: f64) -> VerificationMetrics {
        VerificationMetrics {
            error_rate_before: 0.10,
            error_rate_after,
            latency_before: 500.0,
            latency_after: 200.0,
            restart_count_delta_post: restart_delta,
            pods_ready_ratio: ready_ratio,
        }
    }

    #[test]
    fn success_requires_all_three_conditions() {
        assert!(evaluate_success(metrics(0.04, 0, 0.95), 0.05));
        assert!(!evaluate_success(metrics(0.04, 1, 0.95), 0.05), "restart delta must be zero");
        assert!(!evaluate_success(metrics(0.04, 0, 0.80), 0.05), "ready ratio must be >= 0.9");
        assert!(!evaluate_success(metrics(0.08, 0, 0.95), 0.05), "error rate must clear a threshold");
    }

    #[test]
    fn metrics_improved_is_independent_of_success_threshold() {
        assert!(evaluate_metrics_improved(metrics(0.09, 1, 0.5)));
        assert!(!evaluate_metrics_improved(metrics(0.11, 0, 0.95)));
    }
}
