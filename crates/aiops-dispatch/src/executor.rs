// aiops-dispatch/src/executor.rs
// ============================================================================
// Module: Remediation Executor
// Description: Idempotency, leasing, and retry/backoff wrapper around
//              action backend dispatch (C5).
// Purpose: Turn a gated `RemediationAction` into a terminal execution
//          result, replaying a cached result for a repeated idempotency
//          key instead of re-executing, retrying transient backend errors
//          per the bounded backoff schedule, and enforcing per-attempt and
//          overall deadlines.
// Dependencies: aiops-core, rand, std::time
// ============================================================================

//! ## Overview
//! [`RemediationExecutor`] is the host that drives [`ActionBackend::execute`]
//! (§4.5): it checks the idempotency cache first, acquires the target lease,
//! dispatches through the [`BackendRegistry`], and retries transient backend
//! errors with [`ActivityRetryPolicy`]'s `1s -> 4s -> 16s` schedule, stopping
//! immediately (no retry) on a target-not-found, forbidden, or deadline-
//! exceeded outcome. Unlike the deterministic workflow core, this module
//! reads the wall clock directly and blocks the calling thread between
//! attempts — it is an I/O-performing host component, not part of the
//! replayable journal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::thread;
use std::time::Duration;
use std::time::Instant;

use aiops_core::ActivityRetryPolicy;
use aiops_core::ExecutionResult;
use aiops_core::ExecutorError;
use aiops_core::RemediationAction;
use aiops_core::WorkflowStore;
use aiops_core::WorkflowStoreError;
use rand::Rng;
use thiserror::Error;

use crate::lease::LeaseError;
use crate::lease::LeaseManager;
use crate::registry::BackendRegistry;
use crate::registry::BackendRegistryError;

// ============================================================================
// SECTION: Dispatch Error
// ============================================================================

/// Infrastructure failures around executing an action: these stop the
/// attempt before it ever reaches a backend, distinct from the backend
/// outcomes [`ExecutionResult`] already models.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No backend is registered for the action's resolved scheme.
    #[error(transparent)]
    Backend(#[from] BackendRegistryError),
    /// The action's target is already leased by another in-flight action.
    #[error(transparent)]
    Lease(#[from] LeaseError),
    /// The idempotency cache or action record could not be read or written.
    #[error(transparent)]
    Store(#[from] WorkflowStoreError),
}

// ============================================================================
// SECTION: Executor Configuration
// ============================================================================

/// Per-attempt and overall execution deadlines (§4.5: default 60s per
/// attempt, 5 minutes overall).
///
/// `per_attempt_ms` is not enforced by [`RemediationExecutor`] itself:
/// [`ActionBackend::execute`] is a single synchronous call with no deadline
/// parameter, so a concrete backend is expected to bound its own call with
/// this value and report [`ExecutorError::Timeout`] if it elapses. The
/// executor enforces `overall_ms` across the whole retry sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionDeadlines {
    /// Deadline a backend implementation should bound a single call to, in
    /// milliseconds.
    pub per_attempt_ms: u64,
    /// Deadline across every attempt of one action, in milliseconds,
    /// enforced by the executor's retry loop.
    pub overall_ms: u64,
}

// ============================================================================
// SECTION: Remediation Executor
// ============================================================================

/// Drives action execution through a scheme-keyed [`BackendRegistry`] with
/// idempotency caching, per-target leasing, and bounded retry (§4.5).
///
/// # Invariants
/// - An action whose `idempotency_key` is already cached in `store` is never
///   re-executed; the cached record is returned as-is (§3, §8).
/// - The target lease is held only for the duration of one `execute` call
///   and is always released, even when a backend call panics or an early
///   `?` returns.
pub struct RemediationExecutor<S: WorkflowStore> {
    /// Scheme-keyed action backends.
    backends: BackendRegistry,
    /// Per-target mutual exclusion for in-flight actions.
    leases: LeaseManager,
    /// Retry/backoff schedule for transient backend errors.
    retry_policy: ActivityRetryPolicy,
    /// Per-attempt and overall execution deadlines.
    deadlines: ExecutionDeadlines,
    /// Idempotency cache and action record store.
    store: S,
}

impl<S: WorkflowStore> RemediationExecutor<S> {
    /// Builds an executor over `backends` and `store`, using the default
    /// activity retry policy.
    #[must_use]
    pub fn new(backends: BackendRegistry, store: S, deadlines: ExecutionDeadlines) -> Self {
        Self {
            backends,
            leases: LeaseManager::new(),
            retry_policy: ActivityRetryPolicy::new(),
            deadlines,
            store,
        }
    }

    /// Executes `action`, returning the updated record once it reaches a
    /// terminal status.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the action cannot even be dispatched:
    /// no backend for its scheme, its target is already leased, or the
    /// idempotency cache or action record cannot be read or written. Backend
    /// outcomes (not-found, forbidden, timeout, transient failure after
    /// exhausting retries) are reported in the returned action's
    /// `execution_result`, not as an `Err`.
    #[tracing::instrument(skip(self, action), fields(action_id = %action.id, target = %action.target_resource))]
    pub fn execute(&self, mut action: RemediationAction) -> Result<RemediationAction, DispatchError> {
        if let Some(cached) = self.store.load_action_by_idempotency_key(action.idempotency_key.as_str())? {
            tracing::debug!("returning cached execution result for idempotency key");
            return Ok(cached);
        }

        let _lease = self.leases.acquire(&action.target_namespace, &action.target_resource)?;
        let backend = self.backends.resolve(&action)?;

        action.status = aiops_core::ActionStatus::Executing;
        let overall_deadline = Instant::now() + Duration::from_millis(self.deadlines.overall_ms);

        let mut attempt: u8 = 1;
        let result = loop {
            if Instant::now() >= overall_deadline {
                tracing::warn!("execution deadline elapsed before a terminal result was reached");
                break ExecutionResult::Timeout;
            }

            match backend.execute(&action) {
                Ok(outcome) => break outcome,
                Err(ExecutorError::NotFound(_)) => break ExecutionResult::NotFound,
                Err(ExecutorError::Forbidden(_)) => break ExecutionResult::Forbidden,
                Err(ExecutorError::Timeout { .. }) => break ExecutionResult::Timeout,
                Err(ExecutorError::Transient(detail)) => {
                    let next_attempt = attempt + 1;
                    if !self.retry_policy.has_attempts_remaining(attempt) {
                        break ExecutionResult::Other { detail };
                    }
                    let jitter_ms = rand::thread_rng().gen_range(0..250);
                    let Some(backoff_ms) = self.retry_policy.backoff_before_attempt(next_attempt, jitter_ms)
                    else {
                        break ExecutionResult::Other { detail };
                    };
                    if Instant::now() + Duration::from_millis(backoff_ms) >= overall_deadline {
                        break ExecutionResult::Timeout;
                    }
                    tracing::debug!(attempt, backoff_ms, "retrying after transient backend error");
                    thread::sleep(Duration::from_millis(backoff_ms));
                    attempt = next_attempt;
                }
            }
        };

        action.status = match &result {
            ExecutionResult::Succeeded { .. } => aiops_core::ActionStatus::Succeeded,
            _ => aiops_core::ActionStatus::Failed,
        };
        tracing::info!(status = ?action.status, "remediation action reached a terminal state");
        action.execution_result = Some(result);
        self.store.save_action(&action)?;
        Ok(action)
    }

    /// Returns whether `(namespace, target_resource)` is currently leased by
    /// an in-flight action.
    #[must_use]
    pub fn is_target_leased(&self, namespace: &str, target_resource: &str) -> bool {
        self.leases.is_leased(namespace, target_resource)
    }

    /// Per-attempt/overall deadlines this executor enforces.
    #[must_use]
    pub const fn deadlines(&self) -> ExecutionDeadlines {
        self.deadlines
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test setup only")]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    use aiops_core::ActionBackend;
    use aiops_core::VerificationId;
    use aiops_core::VerificationResult;

    use super::*;

    struct AlwaysOkBackend;

    impl ActionBackend for AlwaysOkBackend {
        fn scheme(&self) -> &str {
            crate::registry::DEFAULT_SCHEME
        }

        fn execute(&self, _action: &RemediationAction) -> Result<ExecutionResult, ExecutorError> {
            Ok(ExecutionResult::Succeeded { detail: "restarted".to_owned() })
        }
    }

    struct NotFoundBackend;

    impl ActionBackend for NotFoundBackend {
        fn scheme(&self) -> &str {
            crate::registry::DEFAULT_SCHEME
        }

        fn execute(&self, _action: &RemediationAction) -> Result<ExecutionResult, ExecutorError> {
            Err(ExecutorError::NotFound("pod gone".to_owned()))
        }
    }

    struct FlakyThenOkBackend {
        remaining_failures: RefCell<u8>,
    }

    impl ActionBackend for FlakyThenOkBackend {
        fn scheme(&self) -> &str {
            crate::registry::DEFAULT_SCHEME
        }

        fn execute(&self, _action: &RemediationAction) -> Result<ExecutionResult, ExecutorError> {
            let mut remaining = self.remaining_failures.borrow_mut();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ExecutorError::Transient("connection reset".to_owned()));
            }
            Ok(ExecutionResult::Succeeded { detail: "recovered".to_owned() })
        }
    }

    #[derive(Default)]
    struct InMemoryStore {
        actions: RefCell<BTreeMap<String, RemediationAction>>,
    }

    impl WorkflowStore for InMemoryStore {
        fn append_event(
            &self,
            _incident_id: &aiops_core::IncidentId,
            _event_json: &str,
        ) -> Result<(), WorkflowStoreError> {
            Ok(())
        }

        fn load_journal(
            &self,
            _incident_id: &aiops_core::IncidentId,
        ) -> Result<Vec<String>, WorkflowStoreError> {
            Ok(Vec::new())
        }

        fn load_incident(
            &self,
            _incident_id: &aiops_core::IncidentId,
        ) -> Result<Option<aiops_core::Incident>, WorkflowStoreError> {
            Ok(None)
        }

        fn save_incident(&self, _incident: &aiops_core::Incident) -> Result<(), WorkflowStoreError> {
            Ok(())
        }

        fn load_action_by_idempotency_key(
            &self,
            idempotency_key: &str,
        ) -> Result<Option<RemediationAction>, WorkflowStoreError> {
            Ok(self.actions.borrow().get(idempotency_key).cloned())
        }

        fn save_action(&self, action: &RemediationAction) -> Result<(), WorkflowStoreError> {
            self.actions
                .borrow_mut()
                .insert(action.idempotency_key.as_str().to_owned(), action.clone());
            Ok(())
        }

        fn save_verification(
            &self,
            _verification_id: &VerificationId,
            _result: &VerificationResult,
        ) -> Result<(), WorkflowStoreError> {
            Ok(())
        }
    }

    fn sample_action() -> RemediationAction {
        crate::test_support::sample_action()
    }

    fn default_deadlines() -> ExecutionDeadlines {
        ExecutionDeadlines { per_attempt_ms: 1_000, overall_ms: 30_000 }
    }

    #[test]
    fn successful_execution_is_marked_succeeded_and_persisted() {
        let mut backends = BackendRegistry::new();
        backends.register(AlwaysOkBackend);
        let executor = RemediationExecutor::new(backends, InMemoryStore::default(), default_deadlines());

        let action = executor.execute(sample_action()).unwrap();
        assert_eq!(action.status, aiops_core::ActionStatus::Succeeded);
        assert!(matches!(action.execution_result, Some(ExecutionResult::Succeeded { .. })));
    }

    #[test]
    fn not_found_is_terminal_without_retry() {
        let mut backends = BackendRegistry::new();
        backends.register(NotFoundBackend);
        let executor = RemediationExecutor::new(backends, InMemoryStore::default(), default_deadlines());

        let action = executor.execute(sample_action()).unwrap();
        assert_eq!(action.status, aiops_core::ActionStatus::Failed);
        assert!(matches!(action.execution_result, Some(ExecutionResult::NotFound)));
    }

    #[test]
    fn transient_errors_retry_until_success() {
        let mut backends = BackendRegistry::new();
        backends.register(FlakyThenOkBackend { remaining_failures: RefCell::new(1) });
        let executor = RemediationExecutor::new(backends, InMemoryStore::default(), default_deadlines());

        let action = executor.execute(sample_action()).unwrap();
        assert_eq!(action.status, aiops_core::ActionStatus::Succeeded);
    }

    #[test]
    fn repeated_idempotency_key_returns_cached_record_without_re_executing() {
        let mut backends = BackendRegistry::new();
        backends.register(AlwaysOkBackend);
        let executor = RemediationExecutor::new(backends, InMemoryStore::default(), default_deadlines());

        let action = sample_action();
        let first = executor.execute(action.clone()).unwrap();
        let second = executor.execute(action).unwrap();
        assert_eq!(first.execution_result, second.execution_result);
    }
}
