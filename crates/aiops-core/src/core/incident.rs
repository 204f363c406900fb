// aiops-core/src/core/incident.rs
// ============================================================================
// Module: Incident
// Description: The incident entity and its status state machine values.
// Purpose: Canonical incident record shared by C1-C7.
// Dependencies: serde, crate::core::{identifiers, time}
// ============================================================================

//! ## Overview
//! An incident is opened from a normalized alert (§6) and carries the
//! identifying `fingerprint` used for deduplication: two alerts with the same
//! fingerprint map to the same workflow instance. `status` values are the
//! states of the [C7 workflow](crate::workflow) state machine (§4.7); the
//! legal transitions themselves live in `crate::workflow`, not here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ClusterId;
use crate::core::identifiers::IncidentId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Severity
// ============================================================================

/// Incident severity as reported by the originating alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational; no action implied.
    Info,
    /// Warning; may warrant investigation.
    Warning,
    /// Critical; active degradation.
    Critical,
    /// Page; requires immediate operator attention.
    Page,
}

// ============================================================================
// SECTION: Status
// ============================================================================

/// The incident's current position in the [C7 workflow](crate::workflow)
/// state machine (§4.7).
///
/// # Invariants
/// - Transitions follow the state machine in `crate::workflow`; this type
///   itself does not enforce them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    /// Freshly opened; evidence collection has not started.
    Open,
    /// Evidence collection and hypothesis ranking in progress.
    Investigating,
    /// A remediation action has been selected and is progressing toward
    /// execution (policy gate, approval wait).
    Remediating,
    /// The policy gate requires human approval before the selected action
    /// can execute.
    AwaitingApproval,
    /// A remediation action is executing.
    Executing,
    /// A remediation action has executed and verification is pending.
    Verifying,
    /// Terminal: the incident is resolved.
    Resolved,
    /// Terminal: the incident could not be remediated within its retry
    /// budget, or was cancelled, or timed out on approval.
    Failed,
}

impl IncidentStatus {
    /// Returns whether this status is terminal (no further transitions).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Failed)
    }
}

// ============================================================================
// SECTION: Incident
// ============================================================================

/// A single incident opened from a normalized alert.
///
/// # Invariants
/// - `fingerprint` is globally unique.
/// - `status` transitions follow the §4.7 state machine.
/// - `resolved_at >= started_at` whenever `resolved_at` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Incident identifier.
    pub id: IncidentId,
    /// Stable dedup key: supplied by the alert or derived as a hash of
    /// `(alertname, cluster, namespace, service, labels)`.
    pub fingerprint: String,
    /// Human-readable incident title.
    pub title: String,
    /// Severity as reported by the originating alert.
    pub severity: Severity,
    /// Current workflow status.
    pub status: IncidentStatus,
    /// The alerting system that raised this incident.
    pub source: String,
    /// Cluster the incident was observed in.
    pub cluster: ClusterId,
    /// Namespace the incident concerns.
    pub namespace: String,
    /// Service the incident concerns, if the alert named one.
    pub service: Option<String>,
    /// Free-form labels copied from the alert.
    pub labels: BTreeMap<String, String>,
    /// Free-form annotations copied from the alert.
    pub annotations: BTreeMap<String, String>,
    /// When the incident started (per the alert, not ingestion time).
    pub started_at: Timestamp,
    /// When an operator acknowledged the incident, if any.
    pub acknowledged_at: Option<Timestamp>,
    /// When the incident reached a terminal status, if any.
    pub resolved_at: Option<Timestamp>,
}

impl Incident {
    /// Returns `true` if `resolved_at` is set and satisfies
    /// `resolved_at >= started_at`.
    #[must_use]
    pub fn resolution_is_well_ordered(&self) -> bool {
        self.resolved_at.is_none_or(|resolved_at| resolved_at >= self.started_at)
    }
}

#[cfg(test)]
mod tests {
    use super::Incident;
    use super::IncidentStatus;
    use super::Severity;
    use crate::core::identifiers::ClusterId;
    use crate::core::identifiers::IncidentId;
    use crate::core::time::Timestamp;
    use std::collections::BTreeMap;

    fn sample_incident(resolved_at: Option<Timestamp>) -> Incident {
        Incident {
            id: IncidentId::new("inc-1"),
            fingerprint: "fp-1".to_owned(),
            title: "pod in CrashLoopBackOff".to_owned(),
            severity: Severity::Critical,
            status: IncidentStatus::Open,
            source: "prometheus".to_owned(),
            cluster: ClusterId::new("us-east-1"),
            namespace: "payments".to_owned(),
            service: Some("checkout".to_owned()),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            started_at: Timestamp::UnixMillis(1_000),
            acknowledged_at: None,
            resolved_at,
        }
    }

    #[test]
    fn unresolved_incident_is_well_ordered() {
        assert!(sample_incident(None).resolution_is_well_ordered());
    }

    #[test]
    fn resolved_at_before_started_at_is_rejected() {
        let incident = sample_incident(Some(Timestamp::UnixMillis(500)));
        assert!(!incident.resolution_is_well_ordered());
    }

    #[test]
    fn terminal_statuses_are_resolved_and_failed_only() {
        assert!(IncidentStatus::Resolved.is_terminal());
        assert!(IncidentStatus::Failed.is_terminal());
        assert!(!IncidentStatus::Investigating.is_terminal());
    }
}
