// aiops-core/src/workflow/state.rs
// ============================================================================
// Module: Incident Workflow State Machine
// Description: The legal-transition function enforcing the §4.7 state
//              diagram over `crate::core::incident::IncidentStatus`.
// Purpose: Give the workflow driver (the host applying journaled events) a
//          single pure function deciding whether a transition is legal,
//          rather than scattering ad hoc status checks across callers.
// Dependencies: thiserror, crate::core::incident
// ============================================================================

//! ## Overview
//! [`IncidentStatus`] itself carries no transition logic (see its own doc
//! comment); this module is where the diagram from §4.7 is enforced:
//!
//! ```text
//! open          -> investigating
//! investigating -> remediating | resolved
//! remediating   -> awaiting_approval | executing
//! awaiting_approval -> executing | failed
//! executing     -> verifying | failed
//! verifying     -> resolved | failed
//! failed        -> remediating   (only if retry budget remains)
//! any           -> resolved      (external acknowledgment, §4.7)
//! ```
//!
//! `resolved` and `failed` are terminal per [`IncidentStatus::is_terminal`],
//! except for the explicit `failed -> remediating` retry re-entry, which the
//! caller must justify with a `TransitionInput::RetryBudgetRemains` flag
//! rather than this module inferring it from elsewhere.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::incident::IncidentStatus;

// ============================================================================
// SECTION: Transition Trigger
// ============================================================================

/// The trigger driving a requested state transition (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionTrigger {
    /// Evidence collection has been dispatched for a newly opened incident.
    BeginInvestigation,
    /// The rules engine produced a hypothesis and a remediation action was
    /// selected.
    BeginRemediation,
    /// The policy gate required human approval before executing.
    RequireApproval,
    /// The policy gate allowed the action to execute directly, or an
    /// approval was granted.
    BeginExecution,
    /// Execution completed and verification is pending `verification_delay`.
    BeginVerification,
    /// The incident was resolved, either by verification success or an
    /// external acknowledgment.
    Resolve,
    /// A step failed terminally for this attempt (approval timeout, policy
    /// denial with no further hypothesis, execution exhaustion, or
    /// verification exhaustion).
    Fail,
    /// A prior `failed` incident is being retried because retry budget
    /// remains.
    RetryRemediation,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// A requested transition that the §4.7 diagram does not permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal transition: {trigger:?} from {from:?}")]
pub struct IllegalTransition {
    /// The status the incident was in when the transition was attempted.
    pub from: IncidentStatus,
    /// The trigger that was rejected.
    pub trigger: TransitionTrigger,
}

// ============================================================================
// SECTION: Transition Function
// ============================================================================

/// Applies `trigger` to `from`, returning the resulting status or an
/// [`IllegalTransition`] if the diagram does not permit it (§4.7).
///
/// `retry_budget_remains` gates `TransitionTrigger::RetryRemediation`: the
/// `failed -> remediating` edge only exists while attempts remain, per the
/// workflow's retry policy (see `crate::workflow::retry`).
pub fn apply_transition(
    from: IncidentStatus,
    trigger: TransitionTrigger,
    retry_budget_remains: bool,
) -> Result<IncidentStatus, IllegalTransition> {
    use IncidentStatus::{
        AwaitingApproval, Executing, Failed, Investigating, Open, Remediating, Resolved, Verifying,
    };
    use TransitionTrigger::{
        BeginExecution, BeginInvestigation, BeginRemediation, BeginVerification, Fail, RequireApproval,
        Resolve, RetryRemediation,
    };

    let illegal = || IllegalTransition { from, trigger };

    // `resolved` on external ack is legal from any non-terminal status, so
    // check it before the per-status match.
    if trigger == Resolve && !from.is_terminal() {
        return Ok(Resolved);
    }

    match (from, trigger) {
        (Open, BeginInvestigation) => Ok(Investigating),
        (Investigating, BeginRemediation) => Ok(Remediating),
        (Remediating, RequireApproval) => Ok(AwaitingApproval),
        (Remediating, BeginExecution) => Ok(Executing),
        (AwaitingApproval, BeginExecution) => Ok(Executing),
        (AwaitingApproval, Fail) => Ok(Failed),
        (Executing, BeginVerification) => Ok(Verifying),
        (Executing, Fail) => Ok(Failed),
        (Verifying, Fail) => Ok(Failed),
        (Failed, RetryRemediation) if retry_budget_remains => Ok(Remediating),
        _ => Err(illegal()),
    }
}

#[cfg(test)]
mod tests {
    use super::apply_transition;
    use super::IncidentStatus;
    use super::TransitionTrigger;

    #[test]
    fn full_happy_path_resolves() {
        let mut status = IncidentStatus::Open;
        for trigger in [
            TransitionTrigger::BeginInvestigation,
            TransitionTrigger::BeginRemediation,
            TransitionTrigger::BeginExecution,
            TransitionTrigger::BeginVerification,
            TransitionTrigger::Resolve,
        ] {
            status = apply_transition(status, trigger, false).expect("legal transition");
        }
        assert_eq!(status, IncidentStatus::Resolved);
    }

    #[test]
    fn failed_retries_only_when_budget_remains() {
        let denied = apply_transition(IncidentStatus::Failed, TransitionTrigger::RetryRemediation, false);
        assert!(denied.is_err());

        let allowed = apply_transition(IncidentStatus::Failed, TransitionTrigger::RetryRemediation, true);
        assert_eq!(allowed, Ok(IncidentStatus::Remediating));
    }

    #[test]
    fn external_ack_resolves_from_any_non_terminal_status() {
        for status in [
            IncidentStatus::Open,
            IncidentStatus::Investigating,
            IncidentStatus::Remediating,
            IncidentStatus::AwaitingApproval,
            IncidentStatus::Executing,
            IncidentStatus::Verifying,
        ] {
            assert_eq!(
                apply_transition(status, TransitionTrigger::Resolve, false),
                Ok(IncidentStatus::Resolved)
            );
        }
    }

    #[test]
    fn resolved_is_terminal_and_rejects_external_ack() {
        let result = apply_transition(IncidentStatus::Resolved, TransitionTrigger::Resolve, false);
        assert!(result.is_err());
    }

    #[test]
    fn skipping_a_stage_is_illegal() {
        let result =
            apply_transition(IncidentStatus::Open, TransitionTrigger::BeginExecution, false);
        assert!(result.is_err());
    }
}
