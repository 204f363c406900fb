// aiops-core/src/workflow/mod.rs
// ============================================================================
// Module: Incident Workflow (C7)
// Description: The durable, replayable incident state machine tying
//              transitions, the journal event vocabulary, and retry policy
//              together (§4.7, §5).
// Purpose: C7's public surface — a journal reducer the host applies one
//          event at a time, producing the incident's current status and
//          surfacing suspension points without ever touching a live clock.
// Dependencies: thiserror, crate::core::incident, crate::workflow::{events,
//               retry, state}
// ============================================================================

//! ## Overview
//! The workflow is modeled as a pure reducer over [`WorkflowEvent`]s:
//! `(WorkflowRunState, WorkflowEvent) -> Result<WorkflowRunState,
//! WorkflowError>`. A host (the eventual workflow driver, not built in this
//! crate) is responsible for:
//! - persisting each event via [`crate::interfaces::WorkflowStore`] *before*
//!   calling [`apply_event`] with it (§4.7's durability contract: journal
//!   first, observe second);
//! - supplying every timestamp the event carries, never reading a clock
//!   itself;
//! - recognizing the [`Suspension`] a run state reports and pausing until
//!   the corresponding event arrives (approval response, verification
//!   delay elapsing, retry backoff elapsing, or a cancellation signal).
//!
//! Replaying a persisted journal from [`WorkflowRunState::new`] through
//! [`apply_event`] in order reproduces the exact same sequence of run
//! states, satisfying the crash-restart resumption requirement in §4.7 and
//! the replay property in §8.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod events;
pub mod retry;
pub mod state;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use events::TerminalReason;
pub use events::WorkflowEvent;
pub use retry::ActivityRetryPolicy;
pub use retry::RemediationRetryBudget;
pub use state::apply_transition;
pub use state::IllegalTransition;
pub use state::TransitionTrigger;

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::hypothesis::Hypothesis;
use crate::core::identifiers::ActionId;
use crate::core::incident::IncidentStatus;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors the workflow reducer can return (§10.2).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    /// The requested transition is not legal from the run's current status.
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),
    /// An event arrived that does not correspond to the run's current
    /// suspension point (e.g. a verification result while awaiting
    /// approval).
    #[error("event {event:?} is not valid while awaiting {expected:?}")]
    UnexpectedEvent {
        /// What the run state was actually waiting for.
        expected: Suspension,
        /// A debug rendering of the event that arrived instead.
        event: String,
    },
}

// ============================================================================
// SECTION: Suspension Points
// ============================================================================

/// A point at which the workflow pauses for an external event (§4.7, §5).
/// All suspension points observe cancellation: a cancel signal arriving
/// while suspended drives the run to `failed(Cancelled)` at the next
/// opportunity rather than issuing any new mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suspension {
    /// Waiting for the parallel evidence-collection join to resolve.
    CollectionJoin,
    /// Waiting for an approval response or its deadline (default 4h).
    ApprovalResponse,
    /// Waiting for an execution attempt to complete, or its retry backoff
    /// to elapse before the next attempt.
    ExecutionAttempt,
    /// Waiting for `verification_delay` to elapse before re-querying
    /// metrics.
    VerificationDelay,
    /// The run has reached a terminal status; nothing further is awaited.
    None,
}

// ============================================================================
// SECTION: Run State
// ============================================================================

/// The workflow's current position: incident status, what it is suspended
/// on, and the bookkeeping (retry budget, ranked hypotheses, selected
/// action) needed to decide the next legal transition.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowRunState {
    /// The incident's current status.
    pub status: IncidentStatus,
    /// What the run is currently suspended waiting for.
    pub suspension: Suspension,
    /// Remaining incident-level remediation retry budget.
    pub retry_budget: RemediationRetryBudget,
    /// Ranked hypotheses produced by the most recent rules-engine pass, if
    /// any.
    pub hypotheses: Vec<Hypothesis>,
    /// The action currently selected for gating/execution, if any.
    pub selected_action: Option<ActionId>,
    /// The current attempt number for the in-flight execution, if any.
    pub execution_attempt: u8,
    /// The last event's timestamp, carried forward so the run state always
    /// knows "now" without reading a clock.
    pub last_event_at: Option<Timestamp>,
}

impl WorkflowRunState {
    /// Builds the initial run state for a freshly opened incident.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: IncidentStatus::Open,
            suspension: Suspension::None,
            retry_budget: RemediationRetryBudget::new(),
            hypotheses: Vec::new(),
            selected_action: None,
            execution_attempt: 0,
            last_event_at: None,
        }
    }
}

impl Default for WorkflowRunState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SECTION: Reducer
// ============================================================================

/// Applies one journaled event to `state`, returning the updated state or
/// the [`WorkflowError`] that rejected it.
///
/// # Errors
/// Returns [`WorkflowError::IllegalTransition`] when the event implies a
/// transition the §4.7 diagram does not permit, or
/// [`WorkflowError::UnexpectedEvent`] when the event does not match what
/// the run is currently suspended on.
pub fn apply_event(
    mut state: WorkflowRunState,
    event: &WorkflowEvent,
) -> Result<WorkflowRunState, WorkflowError> {
    state.last_event_at = Some(event.at());

    match event {
        WorkflowEvent::TriggerReceived { .. } => {
            state.status = apply_transition(state.status, TransitionTrigger::BeginInvestigation, false)?;
            state.suspension = Suspension::CollectionJoin;
        }
        WorkflowEvent::CollectionJoined { .. } => {
            state.suspension = Suspension::None;
        }
        WorkflowEvent::HypothesesRanked { hypotheses, .. } => {
            state.hypotheses.clone_from(hypotheses);
            state.status = apply_transition(state.status, TransitionTrigger::BeginRemediation, false)?;
        }
        WorkflowEvent::PolicyDecided { action_id, decision, .. } => {
            state.selected_action = Some(action_id.clone());
            state.status = match decision {
                crate::policy::PolicyDecision::Allow => {
                    apply_transition(state.status, TransitionTrigger::BeginExecution, false)?
                }
                crate::policy::PolicyDecision::RequireApproval { .. } => {
                    state.suspension = Suspension::ApprovalResponse;
                    apply_transition(state.status, TransitionTrigger::RequireApproval, false)?
                }
                crate::policy::PolicyDecision::Deny { .. } => {
                    apply_transition(state.status, TransitionTrigger::Fail, false)?
                }
            };
            if matches!(decision, crate::policy::PolicyDecision::Allow) {
                state.suspension = Suspension::ExecutionAttempt;
                state.execution_attempt = 1;
            }
        }
        WorkflowEvent::ApprovalRequested { .. } => {
            state.suspension = Suspension::ApprovalResponse;
        }
        WorkflowEvent::ApprovalResolved { approved, .. } => {
            state.status = if *approved {
                state.suspension = Suspension::ExecutionAttempt;
                state.execution_attempt = 1;
                apply_transition(state.status, TransitionTrigger::BeginExecution, false)?
            } else {
                state.suspension = Suspension::None;
                apply_transition(state.status, TransitionTrigger::Fail, false)?
            };
        }
        WorkflowEvent::ExecutionCompleted { attempt, result, .. } => {
            state.execution_attempt = *attempt;
            state.status = match result {
                crate::core::remediation::ExecutionResult::Succeeded { .. } => {
                    state.suspension = Suspension::VerificationDelay;
                    apply_transition(state.status, TransitionTrigger::BeginVerification, false)?
                }
                _ => {
                    state.suspension = Suspension::None;
                    apply_transition(state.status, TransitionTrigger::Fail, false)?
                }
            };
        }
        WorkflowEvent::RetryScheduled { next_attempt, .. } => {
            state.execution_attempt = *next_attempt;
            state.suspension = Suspension::ExecutionAttempt;
        }
        WorkflowEvent::VerificationCompleted { result, .. } => {
            state.suspension = Suspension::None;
            state.status = if result.success {
                apply_transition(state.status, TransitionTrigger::Resolve, false)?
            } else {
                apply_transition(state.status, TransitionTrigger::Fail, false)?
            };
        }
        WorkflowEvent::ExternalAck { .. } => {
            state.suspension = Suspension::None;
            state.status = apply_transition(state.status, TransitionTrigger::Resolve, false)?;
        }
        WorkflowEvent::TerminatedWithoutResolution { .. } => {
            state.suspension = Suspension::None;
            if state.status != IncidentStatus::Failed {
                state.status = apply_transition(state.status, TransitionTrigger::Fail, false)?;
            }
        }
    }

    Ok(state)
}

/// Applies a `failed -> remediating` retry re-entry if `state`'s retry
/// budget allows it (§4.7). Returns `state` unchanged if it is not
/// currently `failed`, or if the budget is exhausted.
///
/// # Errors
/// Returns [`WorkflowError::IllegalTransition`] only in the defensive case
/// where `state.status` is not `failed`; callers should check
/// `state.status == IncidentStatus::Failed` before calling this.
pub fn retry_remediation(mut state: WorkflowRunState) -> Result<WorkflowRunState, WorkflowError> {
    let budget_remains = state.retry_budget.remains();
    state.status = apply_transition(state.status, TransitionTrigger::RetryRemediation, budget_remains)?;
    state.retry_budget = state.retry_budget.consume();
    state.suspension = Suspension::None;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::apply_event;
    use super::retry_remediation;
    use super::Suspension;
    use super::WorkflowEvent;
    use super::WorkflowRunState;
    use crate::core::hypothesis::Category;
    use crate::core::hypothesis::GeneratedBy;
    use crate::core::hypothesis::Hypothesis;
    use crate::core::identifiers::ActionId;
    use crate::core::identifiers::HypothesisId;
    use crate::core::identifiers::IncidentId;
    use crate::core::incident::IncidentStatus;
    use crate::core::remediation::ExecutionResult;
    use crate::core::time::Timestamp;
    use crate::policy::PolicyDecision;
    use crate::policy::PolicyReason;

    fn sample_hypothesis() -> Hypothesis {
        Hypothesis {
            id: HypothesisId::new("h1"),
            incident_id: IncidentId::new("inc-1"),
            category: Category::MemoryExhaustion,
            title: "OOM".to_owned(),
            description: String::new(),
            confidence: 0.9,
            rank: 1,
            supporting_evidence_ids: Vec::new(),
            contradicting_evidence_ids: Vec::new(),
            recommended_actions: Vec::new(),
            generated_by: GeneratedBy::Rules,
        }
    }

    #[test]
    fn allow_decision_drives_straight_to_execution_suspension() {
        let state = WorkflowRunState::new();
        let state = apply_event(state, &WorkflowEvent::TriggerReceived { at: Timestamp::Logical(1) })
            .expect("open -> investigating");
        let state = apply_event(
            state,
            &WorkflowEvent::CollectionJoined { at: Timestamp::Logical(2), partial: false },
        )
        .expect("join resolves");
        let state = apply_event(
            state,
            &WorkflowEvent::HypothesesRanked {
                at: Timestamp::Logical(3),
                hypotheses: vec![sample_hypothesis()],
            },
        )
        .expect("investigating -> remediating");
        assert_eq!(state.status, IncidentStatus::Remediating);

        let state = apply_event(
            state,
            &WorkflowEvent::PolicyDecided {
                at: Timestamp::Logical(4),
                action_id: ActionId::new("a1"),
                decision: PolicyDecision::Allow,
            },
        )
        .expect("remediating -> executing");
        assert_eq!(state.status, IncidentStatus::Executing);
        assert_eq!(state.suspension, Suspension::ExecutionAttempt);
    }

    #[test]
    fn require_approval_suspends_then_resumes_on_approval() {
        let mut state = WorkflowRunState::new();
        state = apply_event(state, &WorkflowEvent::TriggerReceived { at: Timestamp::Logical(1) }).unwrap();
        state = apply_event(
            state,
            &WorkflowEvent::CollectionJoined { at: Timestamp::Logical(2), partial: false },
        )
        .unwrap();
        state = apply_event(
            state,
            &WorkflowEvent::HypothesesRanked {
                at: Timestamp::Logical(3),
                hypotheses: vec![sample_hypothesis()],
            },
        )
        .unwrap();
        state = apply_event(
            state,
            &WorkflowEvent::PolicyDecided {
                at: Timestamp::Logical(4),
                action_id: ActionId::new("a1"),
                decision: PolicyDecision::RequireApproval { reason: PolicyReason::ProductionEnvironment },
            },
        )
        .unwrap();
        assert_eq!(state.status, IncidentStatus::AwaitingApproval);
        assert_eq!(state.suspension, Suspension::ApprovalResponse);

        let state = apply_event(
            state,
            &WorkflowEvent::ApprovalResolved { at: Timestamp::Logical(5), approved: true },
        )
        .unwrap();
        assert_eq!(state.status, IncidentStatus::Executing);
    }

    #[test]
    fn execution_success_suspends_on_verification_then_resolves() {
        let mut state = WorkflowRunState::new();
        state.status = IncidentStatus::Executing;
        state = apply_event(
            state,
            &WorkflowEvent::ExecutionCompleted {
                at: Timestamp::Logical(1),
                attempt: 1,
                result: ExecutionResult::Succeeded { detail: "ok".to_owned() },
            },
        )
        .unwrap();
        assert_eq!(state.status, IncidentStatus::Verifying);
        assert_eq!(state.suspension, Suspension::VerificationDelay);
    }

    #[test]
    fn failed_can_retry_remediation_while_budget_remains() {
        let mut state = WorkflowRunState::new();
        state.status = IncidentStatus::Failed;
        let state = retry_remediation(state).expect("retry budget remains by default");
        assert_eq!(state.status, IncidentStatus::Remediating);
        assert_eq!(state.retry_budget.attempts_used(), 1);
    }
}
