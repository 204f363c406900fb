// aiops-dispatch/src/test_support.rs
// ============================================================================
// Module: Test Support
// Description: Shared sample-data builders for this crate's unit tests.
// Purpose: Avoid duplicating a `RemediationAction` literal across every
//          module's test block.
// Dependencies: aiops-core
// ============================================================================

use std::collections::BTreeMap;

use aiops_core::derive_idempotency_key;
use aiops_core::ActionId;
use aiops_core::ActionStatus;
use aiops_core::ActionType;
use aiops_core::IncidentId;
use aiops_core::RemediationAction;
use aiops_core::RiskLevel;

/// Builds a `RestartPod` action targeting `payments/checkout`, suitable for
/// exercising the registry, lease, and executor in isolation.
pub fn sample_action() -> RemediationAction {
    let incident_id = IncidentId::new("inc-1");
    let parameters = BTreeMap::new();
    let idempotency_key = derive_idempotency_key(
        &incident_id,
        ActionType::RestartPod,
        "payments",
        "checkout",
        &parameters,
    );
    RemediationAction {
        id: ActionId::new("action-1"),
        incident_id,
        hypothesis_id: None,
        idempotency_key,
        action_type: ActionType::RestartPod,
        target_resource: "checkout".to_owned(),
        target_namespace: "payments".to_owned(),
        parameters,
        risk_level: RiskLevel::Low,
        blast_radius_score: 10.0,
        status: ActionStatus::Approved,
        requires_approval: false,
        approved_by: None,
        approved_at: None,
        executed_at: None,
        completed_at: None,
        execution_result: None,
    }
}
