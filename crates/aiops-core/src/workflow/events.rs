// aiops-core/src/workflow/events.rs
// ============================================================================
// Module: Workflow Journal Events
// Description: The journaled event vocabulary driving incident state
//              transitions (§4.7).
// Purpose: Every state transition and non-pure activity result is one of
//          these events, journaled before it is observed downstream, so a
//          crash-restart can resume from the last journaled point.
// Dependencies: serde, crate::core
// ============================================================================

//! ## Overview
//! The workflow core never reads the wall clock (§4.7): every timestamp an
//! event carries is supplied explicitly by the host driving the workflow,
//! so replaying a persisted journal against the same sequence of supplied
//! timestamps reproduces byte-identical transitions (§8 "replay property").

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::hypothesis::Hypothesis;
use crate::core::identifiers::ActionId;
use crate::core::remediation::ExecutionResult;
use crate::core::time::Timestamp;
use crate::core::verification::VerificationResult;
use crate::policy::PolicyDecision;

// ============================================================================
// SECTION: Cancellation Reason
// ============================================================================

/// Why a workflow was cancelled or failed without completing (§4.7, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    /// An external cancellation signal was observed at a suspension point.
    Cancelled,
    /// The approval wait exceeded its deadline (default 4h).
    ApprovalTimeout,
    /// The policy gate denied the action and no further hypothesis remains.
    PolicyDenied,
    /// Execution failed after exhausting its retry policy.
    ExecutionFailed,
    /// Verification was negative and the retry budget was exhausted.
    VerificationExhausted,
}

// ============================================================================
// SECTION: Workflow Event
// ============================================================================

/// A single journaled workflow event (§4.7).
///
/// # Invariants
/// - Every variant carries its own `at: Timestamp`, supplied by the host;
///   the workflow core never calls a clock itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkflowEvent {
    /// The triggering alert arrived and the incident was opened/matched by
    /// fingerprint.
    TriggerReceived {
        /// When the trigger was observed.
        at: Timestamp,
    },
    /// The parallel evidence-collection join resolved (all collectors
    /// succeeded, some hit their deadline, or the overall budget elapsed).
    CollectionJoined {
        /// When the join resolved.
        at: Timestamp,
        /// Whether any collector's result was partial.
        partial: bool,
    },
    /// The rules engine produced ranked hypotheses.
    HypothesesRanked {
        /// When ranking completed.
        at: Timestamp,
        /// The ranked hypotheses, rank 1 first.
        hypotheses: Vec<Hypothesis>,
    },
    /// The policy gate reached a decision for the selected action.
    PolicyDecided {
        /// When the decision was reached.
        at: Timestamp,
        /// The action being gated.
        action_id: ActionId,
        /// The gate's decision.
        decision: PolicyDecision,
    },
    /// Approval was requested and the workflow is suspending to await a
    /// response.
    ApprovalRequested {
        /// When the request was sent.
        at: Timestamp,
        /// The approval deadline (default 4h after `at`).
        deadline: Timestamp,
    },
    /// An approval response arrived, or the deadline elapsed.
    ApprovalResolved {
        /// When the response (or timeout) was observed.
        at: Timestamp,
        /// Whether the action was approved.
        approved: bool,
    },
    /// An execution attempt completed.
    ExecutionCompleted {
        /// When the attempt completed.
        at: Timestamp,
        /// The attempt number (1-based).
        attempt: u8,
        /// The outcome of this attempt.
        result: ExecutionResult,
    },
    /// A retry was scheduled after a transient execution failure.
    RetryScheduled {
        /// When the retry was scheduled.
        at: Timestamp,
        /// The attempt number that is about to run.
        next_attempt: u8,
        /// Milliseconds to wait before the next attempt.
        backoff_ms: u64,
    },
    /// The verifier produced a result after `verification_delay`.
    VerificationCompleted {
        /// When verification completed.
        at: Timestamp,
        /// The verification result.
        result: VerificationResult,
    },
    /// An external acknowledgment resolved the incident directly.
    ExternalAck {
        /// When the acknowledgment was observed.
        at: Timestamp,
        /// Free-form resolution note.
        note: String,
    },
    /// The workflow reached a terminal, non-resolved state.
    TerminatedWithoutResolution {
        /// When the terminal state was reached.
        at: Timestamp,
        /// Why the workflow terminated without resolving.
        reason: TerminalReason,
    },
}

impl WorkflowEvent {
    /// Returns the timestamp every event variant carries.
    #[must_use]
    pub const fn at(&self) -> Timestamp {
        match self {
            Self::TriggerReceived { at }
            | Self::CollectionJoined { at, .. }
            | Self::HypothesesRanked { at, .. }
            | Self::PolicyDecided { at, .. }
            | Self::ApprovalRequested { at, .. }
            | Self::ApprovalResolved { at, .. }
            | Self::ExecutionCompleted { at, .. }
            | Self::RetryScheduled { at, .. }
            | Self::VerificationCompleted { at, .. }
            | Self::ExternalAck { at, .. }
            | Self::TerminatedWithoutResolution { at, .. } => *at,
        }
    }
}
