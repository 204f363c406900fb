// aiops-core/src/core/summary.rs
// ============================================================================
// Module: Safe Incident Summary
// Description: Redacted, client-facing summary of an incident's state.
// Purpose: Avoid leaking raw evidence payloads or cluster detail into
//          operator-facing or audit-log surfaces.
// Dependencies: serde, crate::core::identifiers
// ============================================================================

//! ## Overview
//! Mirrors the redacted-summary discipline used for the dispatch-facing
//! surface: a caller asking "where does this incident stand" gets status,
//! the top hypothesis category, and a retry hint, never the full evidence
//! set or action parameters.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::hypothesis::Category;
use crate::core::identifiers::IncidentId;
use crate::core::incident::IncidentStatus;

// ============================================================================
// SECTION: Safe Summary
// ============================================================================

/// A redacted summary of an incident's current state, safe to expose on an
/// operator-facing or audit surface without leaking raw evidence or cluster
/// detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeSummary {
    /// The summarized incident.
    pub incident_id: IncidentId,
    /// Current workflow status.
    pub status: IncidentStatus,
    /// The top-ranked hypothesis category, if any hypothesis has been
    /// produced.
    pub top_category: Option<Category>,
    /// A human-readable hint for what would unblock progress (e.g.
    /// "awaiting approval", "retry budget exhausted").
    pub retry_hint: Option<String>,
    /// Free-form policy tags attached during gating (e.g. `freeze_window`,
    /// `protected_namespace`).
    pub policy_tags: Vec<String>,
}

impl SafeSummary {
    /// Builds a summary with no hint or policy tags set.
    #[must_use]
    pub fn new(incident_id: IncidentId, status: IncidentStatus, top_category: Option<Category>) -> Self {
        Self { incident_id, status, top_category, retry_hint: None, policy_tags: Vec::new() }
    }
}
