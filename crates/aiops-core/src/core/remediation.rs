// aiops-core/src/core/remediation.rs
// ============================================================================
// Module: Remediation Action
// Description: Remediation actions proposed, gated, executed, and verified
//              across C4-C6.
// Purpose: Canonical action record, idempotency key derivation, and the
//          action-type/risk vocabulary the policy gate and executor share.
// Dependencies: serde, serde_jcs, sha2, crate::core::identifiers
// ============================================================================

//! ## Overview
//! A [`RemediationAction`] is produced from a hypothesis's recommended
//! [`ActionTemplate`], gated by policy (C4, `crate::policy`), optionally
//! approved, executed (C5), and verified (C6). Its `idempotency_key` binds
//! re-execution: replaying an action with the same key returns the cached
//! record rather than issuing a new cluster mutation (§4.5, §8).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

use crate::core::identifiers::ActionId;
use crate::core::identifiers::HypothesisId;
use crate::core::identifiers::IdempotencyKey;
use crate::core::identifiers::IncidentId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Action Type & Risk
// ============================================================================

/// The kind of remediation action (§3, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Restart a single pod (delete; the controller recreates it).
    RestartPod,
    /// Delete a pod without expecting recreation.
    DeletePod,
    /// Patch a deployment with a rollout-restart annotation.
    RestartDeployment,
    /// Roll a deployment back to its prior revision.
    RollbackDeployment,
    /// Scale a deployment's replica count.
    ScaleReplicas,
    /// Cordon a node (mark unschedulable).
    CordonNode,
    /// Uncordon a node (mark schedulable again).
    UncordonNode,
    /// Drain a node of its workloads.
    DrainNode,
    /// Delete a PersistentVolumeClaim.
    DeletePvc,
    /// Update a workload's resource requests/limits.
    UpdateResourceLimits,
    /// Delete a namespace.
    DeleteNamespace,
    /// Update a ConfigMap.
    UpdateConfigmap,
}

impl ActionType {
    /// The high-risk action set from §4.4: denied outside `dev`.
    pub const HIGH_RISK: &'static [Self] = &[
        Self::DrainNode,
        Self::DeletePvc,
        Self::UpdateResourceLimits,
        Self::DeleteNamespace,
        Self::UpdateConfigmap,
        Self::UncordonNode,
    ];

    /// Returns whether this action type is in the high-risk set.
    #[must_use]
    pub fn is_high_risk(self) -> bool {
        Self::HIGH_RISK.contains(&self)
    }
}

/// The coarse risk classification used in blast-radius scoring (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Low risk.
    Low,
    /// Medium risk.
    Medium,
    /// High risk.
    High,
}

impl RiskLevel {
    /// The `action_risk` weight from §4.4's blast-radius formula.
    #[must_use]
    pub const fn weight(self) -> f64 {
        match self {
            Self::Low => 0.2,
            Self::Medium => 0.5,
            Self::High => 1.0,
        }
    }
}

// ============================================================================
// SECTION: Action Template
// ============================================================================

/// A candidate action a hypothesis recommends, before it is bound to a
/// specific target and turned into a [`RemediationAction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionTemplate {
    /// The action type to take.
    pub action_type: ActionType,
    /// Default risk classification for this action type.
    pub risk_level: RiskLevel,
    /// Default parameters (e.g. `{"replicas": "3"}`), merged with
    /// incident-specific values when the template is instantiated.
    pub default_parameters: BTreeMap<String, String>,
}

// ============================================================================
// SECTION: Status
// ============================================================================

/// A remediation action's lifecycle status (§3, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Proposed from a hypothesis, not yet policy-gated.
    Proposed,
    /// The policy gate denied this action.
    PolicyDenied,
    /// The policy gate requires human approval before execution.
    AwaitingApproval,
    /// An approver has approved this action.
    Approved,
    /// Execution is in progress.
    Executing,
    /// Execution completed successfully.
    Succeeded,
    /// Execution failed (after exhausting retries).
    Failed,
    /// Execution succeeded and verification confirmed recovery.
    Verified,
    /// Execution succeeded but verification did not confirm recovery.
    Unverified,
}

impl ActionStatus {
    /// Returns whether this status is terminal for the action (no further
    /// transitions for this action record).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::PolicyDenied | Self::Failed | Self::Verified | Self::Unverified
        )
    }
}

// ============================================================================
// SECTION: Execution Result
// ============================================================================

/// The outcome of executing an action (§4.5, §7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionResult {
    /// The action succeeded; the cluster now reflects the intended state.
    Succeeded {
        /// Free-form detail from the backend (e.g. new revision id).
        detail: String,
    },
    /// The target resource did not exist.
    NotFound,
    /// The executor lacked permission to act.
    Forbidden,
    /// The action exceeded its deadline after exhausting retries.
    Timeout,
    /// Some other backend error, after exhausting retries.
    Other {
        /// Free-form error detail.
        detail: String,
    },
}

// ============================================================================
// SECTION: Remediation Action
// ============================================================================

/// A remediation action bound to a specific target, moving through policy
/// gating, approval, execution, and verification.
///
/// # Invariants
/// - `idempotency_key` is unique; re-issuing an action with an existing key
///   returns the prior record's `execution_result` without re-executing
///   (§3, §8).
/// - At most one non-terminal action exists per incident at a time (§8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationAction {
    /// Action identifier.
    pub id: ActionId,
    /// Owning incident.
    pub incident_id: IncidentId,
    /// The hypothesis this action was recommended by, if any.
    pub hypothesis_id: Option<HypothesisId>,
    /// Idempotency key: `(incident_id, action_type, target, parameters_hash)`.
    pub idempotency_key: IdempotencyKey,
    /// The action type.
    pub action_type: ActionType,
    /// The target resource name (e.g. pod name, deployment name, node name).
    pub target_resource: String,
    /// The target namespace.
    pub target_namespace: String,
    /// Action parameters (e.g. replica count, rollback target revision).
    pub parameters: BTreeMap<String, String>,
    /// Risk classification.
    pub risk_level: RiskLevel,
    /// Blast radius score in `[0, 100]` (§4.4).
    pub blast_radius_score: f64,
    /// Current lifecycle status.
    pub status: ActionStatus,
    /// Whether the policy gate required approval for this action.
    pub requires_approval: bool,
    /// Who approved this action, if approval was required and granted.
    pub approved_by: Option<String>,
    /// When the action was approved, if applicable.
    pub approved_at: Option<Timestamp>,
    /// When execution started, if it has.
    pub executed_at: Option<Timestamp>,
    /// When the action reached a terminal status, if it has.
    pub completed_at: Option<Timestamp>,
    /// The outcome of execution, once attempted.
    pub execution_result: Option<ExecutionResult>,
}

/// Derives the idempotency key `(incident_id, action_type, target,
/// parameters_hash)` (§4.5) from its constituent parts. `parameters` is
/// canonicalized with JCS (RFC 8785) before hashing, so key ordering or
/// representation never affects the result.
#[must_use]
pub fn derive_idempotency_key(
    incident_id: &IncidentId,
    action_type: ActionType,
    target_namespace: &str,
    target_resource: &str,
    parameters: &BTreeMap<String, String>,
) -> IdempotencyKey {
    let mut hasher = Sha256::new();
    hasher.update(incident_id.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(format!("{action_type:?}").as_bytes());
    hasher.update([0u8]);
    hasher.update(target_namespace.as_bytes());
    hasher.update([0u8]);
    hasher.update(target_resource.as_bytes());
    hasher.update([0u8]);
    hasher.update(serde_jcs::to_vec(parameters).unwrap_or_default());
    let digest = hasher.finalize();
    IdempotencyKey::new(format!("{digest:x}"))
}

#[cfg(test)]
mod tests {
    use super::derive_idempotency_key;
    use super::ActionType;
    use crate::core::identifiers::IncidentId;
    use std::collections::BTreeMap;

    #[test]
    fn idempotency_key_is_stable_across_parameter_insertion_order() {
        let incident = IncidentId::new("inc-1");
        let mut params_a = BTreeMap::new();
        params_a.insert("replicas".to_owned(), "3".to_owned());
        params_a.insert("reason".to_owned(), "oom".to_owned());

        let mut params_b = BTreeMap::new();
        params_b.insert("reason".to_owned(), "oom".to_owned());
        params_b.insert("replicas".to_owned(), "3".to_owned());

        let key_a = derive_idempotency_key(
            &incident,
            ActionType::ScaleReplicas,
            "payments",
            "checkout",
            &params_a,
        );
        let key_b = derive_idempotency_key(
            &incident,
            ActionType::ScaleReplicas,
            "payments",
            "checkout",
            &params_b,
        );
        assert_eq!(key_a, key_b);
    }

    #[test]
    fn idempotency_key_differs_on_target_resource() {
        let incident = IncidentId::new("inc-1");
        let params = BTreeMap::new();
        let key_a =
            derive_idempotency_key(&incident, ActionType::RestartPod, "payments", "checkout-1", &params);
        let key_b =
            derive_idempotency_key(&incident, ActionType::RestartPod, "payments", "checkout-2", &params);
        assert_ne!(key_a, key_b);
    }

    #[test]
    fn high_risk_set_matches_spec_table() {
        assert!(ActionType::DrainNode.is_high_risk());
        assert!(ActionType::DeletePvc.is_high_risk());
        assert!(ActionType::UpdateResourceLimits.is_high_risk());
        assert!(ActionType::DeleteNamespace.is_high_risk());
        assert!(ActionType::UpdateConfigmap.is_high_risk());
        assert!(ActionType::UncordonNode.is_high_risk());
        assert!(!ActionType::RestartPod.is_high_risk());
    }
}
