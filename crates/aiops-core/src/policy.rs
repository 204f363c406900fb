// aiops-core/src/policy.rs
// ============================================================================
// Module: Blast Radius & Policy Gate (C4)
// Description: Blast-radius scoring and the deterministic ALLOW/
//              REQUIRE_APPROVAL/DENY decision tree.
// Purpose: A pure, side-effect-free gate between a proposed remediation
//          action and its execution (§4.4).
// Dependencies: serde, crate::core::remediation
// ============================================================================

//! ## Overview
//! The policy gate is the sole authority on whether a proposed remediation
//! action may proceed. It is a pure function: identical [`PolicyInputs`]
//! always produce the identical [`PolicyDecision`] (§8 "Policy gate
//! purity"). Per the Open Question resolved in §9/§10 (see `DESIGN.md`),
//! the per-environment action allowlist lives **only** here — the workflow
//! and executor never branch on an allowlist of their own.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::remediation::ActionType;
use crate::core::remediation::RiskLevel;

// ============================================================================
// SECTION: Environment
// ============================================================================

/// The deployment environment an action targets (§4.4, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Development: the least restrictive environment.
    Dev,
    /// Staging: intermediate restrictions.
    Staging,
    /// Production: the most restrictive environment.
    Prod,
}

impl Environment {
    /// The `environment_weight` term in the blast-radius formula (§4.4).
    #[must_use]
    pub const fn weight(self) -> f64 {
        match self {
            Self::Dev => 0.1,
            Self::Staging => 0.5,
            Self::Prod => 1.0,
        }
    }

    /// The blast-radius score threshold above which an action is denied in
    /// this environment; `None` means no threshold (dev).
    #[must_use]
    pub const fn blast_radius_threshold(self) -> Option<f64> {
        match self {
            Self::Dev => None,
            Self::Staging => Some(75.0),
            Self::Prod => Some(50.0),
        }
    }

    /// The default per-environment action allowlist (§6).
    #[must_use]
    pub fn default_allowlist(self) -> BTreeSet<ActionType> {
        match self {
            Self::Dev => BTreeSet::from([
                ActionType::RestartPod,
                ActionType::DeletePod,
                ActionType::RestartDeployment,
                ActionType::RollbackDeployment,
                ActionType::ScaleReplicas,
                ActionType::CordonNode,
            ]),
            Self::Staging => BTreeSet::from([
                ActionType::RestartPod,
                ActionType::DeletePod,
                ActionType::RestartDeployment,
                ActionType::ScaleReplicas,
                ActionType::RollbackDeployment,
            ]),
            Self::Prod => BTreeSet::from([
                ActionType::RestartPod,
                ActionType::DeletePod,
                ActionType::RestartDeployment,
                ActionType::ScaleReplicas,
            ]),
        }
    }
}

/// Protected namespaces denied outside `dev` (§4.4).
pub const PROTECTED_NAMESPACES: &[&str] =
    &["kube-system", "kube-public", "kube-node-lease", "istio-system", "cert-manager", "monitoring"];

/// Action types requiring approval regardless of blast radius (§4.4).
pub const APPROVAL_REQUIRED_ACTION_TYPES: &[ActionType] =
    &[ActionType::RollbackDeployment, ActionType::CordonNode];

// ============================================================================
// SECTION: Blast Radius Scoring
// ============================================================================

/// Weights in the blast-radius formula (§4.4); defaults are `w = (40, 20,
/// 20, 20)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlastRadiusWeights {
    /// `w₁`: replica-fraction-affected weight.
    pub replica_fraction: f64,
    /// `w₂`: namespace-criticality weight.
    pub namespace_criticality: f64,
    /// `w₃`: environment weight.
    pub environment: f64,
    /// `w₄`: action-risk weight.
    pub action_risk: f64,
}

impl Default for BlastRadiusWeights {
    fn default() -> Self {
        Self { replica_fraction: 40.0, namespace_criticality: 20.0, environment: 20.0, action_risk: 20.0 }
    }
}

/// Inputs to the blast-radius score (§4.4).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlastRadiusInputs {
    /// Fraction (`0.0..=1.0`) of the workload's replicas the action affects.
    pub replica_fraction_affected: f64,
    /// Namespace criticality (`0.0..=1.0`; higher is more critical).
    pub namespace_criticality: f64,
    /// Target environment.
    pub environment: Environment,
    /// The action's risk classification.
    pub action_risk: RiskLevel,
}

/// Computes the blast-radius score (0-100) per §4.4's weighted formula.
#[must_use]
pub fn blast_radius_score(inputs: BlastRadiusInputs, weights: BlastRadiusWeights) -> f64 {
    let score = weights.replica_fraction * inputs.replica_fraction_affected.clamp(0.0, 1.0)
        + weights.namespace_criticality * inputs.namespace_criticality.clamp(0.0, 1.0)
        + weights.environment * inputs.environment.weight()
        + weights.action_risk * inputs.action_risk.weight();
    score.clamp(0.0, 100.0)
}

// ============================================================================
// SECTION: Policy Inputs & Decision
// ============================================================================

/// The full set of inputs the policy gate consults (§4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyInputs {
    /// Target environment.
    pub environment: Environment,
    /// The action type being gated.
    pub action_type: ActionType,
    /// The target namespace.
    pub namespace: String,
    /// The precomputed blast-radius score (0-100).
    pub blast_radius_score: f64,
    /// Number of replicas the action affects.
    pub affected_replicas: u32,
    /// The current hour, `0..=23`, in the cluster's configured timezone.
    pub current_hour: u8,
    /// Whether today is a weekend day.
    pub is_weekend: bool,
    /// Whether an operator-declared freeze window is active.
    pub freeze_active: bool,
    /// The environment's action allowlist (§4.4, §6; §9 open question: this
    /// is the gate's sole copy, never duplicated elsewhere).
    pub allowlist: BTreeSet<ActionType>,
}

/// The gate's decision (§4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyDecision {
    /// The action may proceed without human approval.
    Allow,
    /// The action requires human approval before proceeding.
    RequireApproval {
        /// Why approval is required.
        reason: PolicyReason,
    },
    /// The action is denied outright.
    Deny {
        /// Why the action was denied.
        reason: PolicyReason,
    },
}

/// A stable, matchable reason code for a non-`Allow` decision, persisted on
/// the audit record (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyReason {
    /// Action type is in the high-risk set, outside dev.
    HighRiskAction,
    /// Target namespace is protected, outside dev.
    ProtectedNamespace,
    /// Blast radius score exceeds the environment's threshold.
    BlastRadiusExceeded,
    /// Affected replica count is at or above the outside-dev threshold.
    AffectedReplicasExceeded,
    /// Action type is not in the environment's allowlist.
    NotAllowlisted,
    /// Environment is production.
    ProductionEnvironment,
    /// Environment is staging and blast radius crossed the approval
    /// threshold.
    StagingElevatedBlastRadius,
    /// Action type always requires approval.
    ApprovalRequiredActionType,
    /// Affected replica count crossed the approval threshold.
    AffectedReplicasElevated,
    /// Current time falls inside the freeze window.
    FreezeWindow,
}

/// An audit record of one gate evaluation: its inputs, decision, and which
/// rule decided it (§4.4 "persisted for audit").
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyAuditRecord {
    /// The inputs the decision was computed from.
    pub inputs: PolicyInputs,
    /// The decision reached.
    pub decision: PolicyDecision,
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

const HIGH_RISK_AFFECTED_REPLICAS_THRESHOLD: u32 = 5;
const APPROVAL_AFFECTED_REPLICAS_THRESHOLD: u32 = 3;
const STAGING_APPROVAL_BLAST_RADIUS_THRESHOLD: f64 = 30.0;
const FREEZE_WINDOW_START_HOUR: u8 = 22;
const FREEZE_WINDOW_END_HOUR: u8 = 6;

/// Evaluates `inputs` and returns the gate's decision. Pure and side-effect
/// free: identical inputs always produce the identical decision (§8).
#[must_use]
pub fn evaluate_policy(inputs: &PolicyInputs) -> PolicyDecision {
    if inputs.action_type.is_high_risk() && inputs.environment != Environment::Dev {
        return PolicyDecision::Deny { reason: PolicyReason::HighRiskAction };
    }

    if inputs.environment != Environment::Dev
        && PROTECTED_NAMESPACES.contains(&inputs.namespace.as_str())
    {
        return PolicyDecision::Deny { reason: PolicyReason::ProtectedNamespace };
    }

    if let Some(threshold) = inputs.environment.blast_radius_threshold() {
        if inputs.blast_radius_score > threshold {
            return PolicyDecision::Deny { reason: PolicyReason::BlastRadiusExceeded };
        }
    }
    if inputs.environment != Environment::Dev
        && inputs.affected_replicas >= HIGH_RISK_AFFECTED_REPLICAS_THRESHOLD
    {
        return PolicyDecision::Deny { reason: PolicyReason::AffectedReplicasExceeded };
    }

    if !inputs.allowlist.contains(&inputs.action_type) {
        return PolicyDecision::Deny { reason: PolicyReason::NotAllowlisted };
    }

    if inputs.environment == Environment::Prod {
        return PolicyDecision::RequireApproval { reason: PolicyReason::ProductionEnvironment };
    }
    if inputs.environment == Environment::Staging
        && inputs.blast_radius_score >= STAGING_APPROVAL_BLAST_RADIUS_THRESHOLD
    {
        return PolicyDecision::RequireApproval { reason: PolicyReason::StagingElevatedBlastRadius };
    }
    if APPROVAL_REQUIRED_ACTION_TYPES.contains(&inputs.action_type) {
        return PolicyDecision::RequireApproval { reason: PolicyReason::ApprovalRequiredActionType };
    }
    if inputs.affected_replicas >= APPROVAL_AFFECTED_REPLICAS_THRESHOLD {
        return PolicyDecision::RequireApproval { reason: PolicyReason::AffectedReplicasElevated };
    }
    if is_freeze_window(inputs) {
        return PolicyDecision::RequireApproval { reason: PolicyReason::FreezeWindow };
    }

    PolicyDecision::Allow
}

/// Evaluates `inputs` and returns both the decision and an audit record
/// suitable for persistence.
#[must_use]
pub fn evaluate_policy_with_audit(inputs: PolicyInputs) -> PolicyAuditRecord {
    let decision = evaluate_policy(&inputs);
    PolicyAuditRecord { inputs, decision }
}

fn is_freeze_window(inputs: &PolicyInputs) -> bool {
    inputs.current_hour >= FREEZE_WINDOW_START_HOUR
        || inputs.current_hour < FREEZE_WINDOW_END_HOUR
        || (inputs.environment == Environment::Prod && inputs.is_weekend)
        || inputs.freeze_active
}

#[cfg(test)]
mod tests {
    use super::blast_radius_score;
    use super::evaluate_policy;
    use super::BlastRadiusInputs;
    use super::BlastRadiusWeights;
    use super::Environment;
    use super::PolicyDecision;
    use super::PolicyInputs;
    use super::PolicyReason;
    use crate::core::remediation::ActionType;
    use crate::core::remediation::RiskLevel;

    fn base_inputs(environment: Environment, action_type: ActionType) -> PolicyInputs {
        PolicyInputs {
            environment,
            action_type,
            namespace: "payments".to_owned(),
            blast_radius_score: 10.0,
            affected_replicas: 1,
            current_hour: 14,
            is_weekend: false,
            freeze_active: false,
            allowlist: environment.default_allowlist(),
        }
    }

    #[test]
    fn high_risk_action_outside_dev_is_denied() {
        let inputs = base_inputs(Environment::Staging, ActionType::DrainNode);
        assert_eq!(
            evaluate_policy(&inputs),
            PolicyDecision::Deny { reason: PolicyReason::HighRiskAction }
        );
    }

    #[test]
    fn high_risk_action_in_dev_is_not_denied_for_that_reason() {
        let inputs = base_inputs(Environment::Dev, ActionType::DrainNode);
        assert_ne!(
            evaluate_policy(&inputs),
            PolicyDecision::Deny { reason: PolicyReason::HighRiskAction }
        );
    }

    #[test]
    fn protected_namespace_outside_dev_is_denied() {
        let mut inputs = base_inputs(Environment::Prod, ActionType::RestartPod);
        inputs.namespace = "kube-system".to_owned();
        assert_eq!(
            evaluate_policy(&inputs),
            PolicyDecision::Deny { reason: PolicyReason::ProtectedNamespace }
        );
    }

    #[test]
    fn blast_radius_boundary_is_deterministic_in_staging() {
        let mut inputs = base_inputs(Environment::Staging, ActionType::RestartPod);
        inputs.blast_radius_score = 75.0;
        assert_ne!(
            evaluate_policy(&inputs),
            PolicyDecision::Deny { reason: PolicyReason::BlastRadiusExceeded }
        );
        inputs.blast_radius_score = 75.01;
        assert_eq!(
            evaluate_policy(&inputs),
            PolicyDecision::Deny { reason: PolicyReason::BlastRadiusExceeded }
        );
    }

    #[test]
    fn production_always_requires_approval_absent_a_denial() {
        let inputs = base_inputs(Environment::Prod, ActionType::RestartPod);
        assert_eq!(
            evaluate_policy(&inputs),
            PolicyDecision::RequireApproval { reason: PolicyReason::ProductionEnvironment }
        );
    }

    #[test]
    fn freeze_window_requires_approval_in_dev() {
        let mut inputs = base_inputs(Environment::Dev, ActionType::RestartPod);
        inputs.current_hour = 23;
        assert_eq!(
            evaluate_policy(&inputs),
            PolicyDecision::RequireApproval { reason: PolicyReason::FreezeWindow }
        );
    }

    #[test]
    fn action_not_on_allowlist_is_denied() {
        let mut inputs = base_inputs(Environment::Prod, ActionType::CordonNode);
        inputs.allowlist = Environment::Prod.default_allowlist();
        assert_eq!(
            evaluate_policy(&inputs),
            PolicyDecision::Deny { reason: PolicyReason::NotAllowlisted }
        );
    }

    #[test]
    fn blast_radius_score_matches_spec_weights() {
        let inputs = BlastRadiusInputs {
            replica_fraction_affected: 0.5,
            namespace_criticality: 0.25,
            environment: Environment::Prod,
            action_risk: RiskLevel::Medium,
        };
        let score = blast_radius_score(inputs, BlastRadiusWeights::default());
        assert!((score - (40.0 * 0.5 + 20.0 * 0.25 + 20.0 * 1.0 + 20.0 * 0.5)).abs() < 1e-9);
    }

    #[test]
    fn evaluate_policy_is_pure() {
        let inputs = base_inputs(Environment::Staging, ActionType::ScaleReplicas);
        assert_eq!(evaluate_policy(&inputs), evaluate_policy(&inputs));
    }
}
