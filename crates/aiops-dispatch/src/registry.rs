// aiops-dispatch/src/registry.rs
// ============================================================================
// Module: Action Backend Registry
// Description: Scheme-keyed registry of remediation action backends.
// Purpose: Resolve a remediation action to the backend that can execute it,
//          without the executor depending on any concrete backend.
// Dependencies: aiops-core
// ============================================================================

//! ## Overview
//! [`BackendRegistry`] mirrors the evidence collector registry's keyed-
//! registry shape (§4.2, §4.5): backends are registered under a URI-style
//! scheme and the registry resolves the right one for a given action,
//! failing closed when no backend covers the action's scheme.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use aiops_core::ActionBackend;
use aiops_core::RemediationAction;
use thiserror::Error;

// ============================================================================
// SECTION: Scheme Resolution
// ============================================================================

/// The default backend scheme every current [`aiops_core::ActionType`]
/// resolves to: every action type the rules engine proposes today
/// (pod/deployment/node/namespace/configmap operations) is Kubernetes-native.
/// `RemediationAction` carries no explicit scheme field, so this is the one
/// fixed mapping point; a future non-Kubernetes action type would need its
/// own resolution rule here rather than a field on the action itself.
pub const DEFAULT_SCHEME: &str = "k8s";

/// Returns the backend scheme an action resolves to.
#[must_use]
pub const fn scheme_for(_action: &RemediationAction) -> &'static str {
    DEFAULT_SCHEME
}

// ============================================================================
// SECTION: Registry Errors
// ============================================================================

/// Errors raised while resolving an action to a registered backend.
#[derive(Debug, Error)]
pub enum BackendRegistryError {
    /// No backend is registered for the resolved scheme.
    #[error("no backend registered for scheme: {0}")]
    MissingBackend(String),
}

// ============================================================================
// SECTION: Backend Registry
// ============================================================================

/// Scheme-keyed registry of [`ActionBackend`] implementations.
///
/// # Invariants
/// - Scheme keys are unique; a later registration overwrites an earlier one
///   for the same scheme.
pub struct BackendRegistry {
    /// Backend implementations keyed by URI-style scheme.
    backends: BTreeMap<String, Arc<dyn ActionBackend + Send + Sync>>,
}

impl BackendRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { backends: BTreeMap::new() }
    }

    /// Registers `backend` under its own reported scheme.
    pub fn register(&mut self, backend: impl ActionBackend + Send + Sync + 'static) {
        let backend = Arc::new(backend);
        self.backends.insert(backend.scheme().to_owned(), backend);
    }

    /// Resolves the backend that should execute `action`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendRegistryError::MissingBackend`] when no backend is
    /// registered for the action's resolved scheme.
    pub fn resolve(
        &self,
        action: &RemediationAction,
    ) -> Result<Arc<dyn ActionBackend + Send + Sync>, BackendRegistryError> {
        let scheme = scheme_for(action);
        self.backends
            .get(scheme)
            .cloned()
            .ok_or_else(|| BackendRegistryError::MissingBackend(scheme.to_owned()))
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test setup only")]
mod tests {
    use aiops_core::ExecutionResult;
    use aiops_core::ExecutorError;

    use super::*;

    struct StubBackend {
        scheme: &'static str,
    }

    impl ActionBackend for StubBackend {
        fn scheme(&self) -> &str {
            self.scheme
        }

        fn execute(&self, _action: &RemediationAction) -> Result<ExecutionResult, ExecutorError> {
            Ok(ExecutionResult::Succeeded { detail: "stub".to_owned() })
        }
    }

    #[test]
    fn missing_backend_is_reported() {
        let registry = BackendRegistry::new();
        let action = crate::test_support::sample_action();
        let err = registry.resolve(&action).expect_err("no backend registered");
        assert!(matches!(err, BackendRegistryError::MissingBackend(scheme) if scheme == DEFAULT_SCHEME));
    }

    #[test]
    fn registered_backend_resolves_by_scheme() {
        let mut registry = BackendRegistry::new();
        registry.register(StubBackend { scheme: DEFAULT_SCHEME });
        let action = crate::test_support::sample_action();
        assert!(registry.resolve(&action).is_ok());
    }
}
