// aiops-dispatch/src/lease.rs
// ============================================================================
// Module: Target Lease Manager
// Description: In-process mutual exclusion over (namespace, target_resource)
//              pairs during action execution.
// Purpose: Prevent two concurrent actions from mutating the same cluster
//          resource at once (§5's concurrency model).
// Dependencies: std::sync
// ============================================================================

//! ## Overview
//! The executor acquires a logical lease keyed by `(namespace,
//! target_resource)` before dispatching an action to a backend, and releases
//! it once the action reaches a terminal state (§5). This is a single-process
//! mutual-exclusion primitive, not a distributed lock: it guards against two
//! concurrent executor tasks racing on the same target within one executor
//! instance. A multi-executor deployment would need a store-backed lease
//! instead; that is out of scope here (the spec names a single executor
//! per §5).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Mutex;

use thiserror::Error;

// ============================================================================
// SECTION: Lease Key
// ============================================================================

/// The key a target lease is held under: `(namespace, target_resource)`.
pub type LeaseKey = (String, String);

/// Errors raised while acquiring a target lease.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LeaseError {
    /// The target is already leased by another in-flight action.
    #[error("target already leased: {namespace}/{target_resource}")]
    AlreadyLeased {
        /// The target's namespace.
        namespace: String,
        /// The target's resource name.
        target_resource: String,
    },
}

// ============================================================================
// SECTION: Lease Manager
// ============================================================================

/// Tracks held target leases for in-flight actions.
///
/// # Invariants
/// - A lease is held for at most one action at a time.
/// - [`LeaseManager::release`] is idempotent: releasing an unheld lease is a
///   no-op rather than an error, since a crash-restart may replay a release
///   for a lease this process never actually acquired.
pub struct LeaseManager {
    /// Currently held lease keys.
    held: Mutex<BTreeSet<LeaseKey>>,
}

impl LeaseManager {
    /// Builds an empty lease manager.
    #[must_use]
    pub fn new() -> Self {
        Self { held: Mutex::new(BTreeSet::new()) }
    }

    /// Acquires the lease for `(namespace, target_resource)`.
    ///
    /// # Errors
    ///
    /// Returns [`LeaseError::AlreadyLeased`] when the target is already held.
    pub fn acquire(&self, namespace: &str, target_resource: &str) -> Result<LeaseGuard<'_>, LeaseError> {
        let key = (namespace.to_owned(), target_resource.to_owned());
        let mut held = self.held.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if !held.insert(key.clone()) {
            tracing::debug!(namespace, target_resource, "target already leased");
            return Err(LeaseError::AlreadyLeased {
                namespace: namespace.to_owned(),
                target_resource: target_resource.to_owned(),
            });
        }
        Ok(LeaseGuard { manager: self, key: Some(key) })
    }

    /// Releases the lease for `key`, if held. Idempotent.
    fn release(&self, key: &LeaseKey) {
        let mut held = self.held.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        held.remove(key);
    }

    /// Returns whether `(namespace, target_resource)` is currently leased.
    #[must_use]
    pub fn is_leased(&self, namespace: &str, target_resource: &str) -> bool {
        let held = self.held.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        held.contains(&(namespace.to_owned(), target_resource.to_owned()))
    }
}

impl Default for LeaseManager {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard releasing its target lease on drop (terminal action state,
/// §5), so an early return or panic during execution still frees the lease.
pub struct LeaseGuard<'manager> {
    /// The manager this lease was acquired from.
    manager: &'manager LeaseManager,
    /// The held key, taken on drop to make release idempotent.
    key: Option<LeaseKey>,
}

impl Drop for LeaseGuard<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.manager.release(&key);
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test setup only")]
mod tests {
    use super::*;

    #[test]
    fn concurrent_lease_on_same_target_is_rejected() {
        let manager = LeaseManager::new();
        let _guard = manager.acquire("payments", "checkout").unwrap();
        let err = manager.acquire("payments", "checkout").expect_err("already leased");
        assert_eq!(
            err,
            LeaseError::AlreadyLeased { namespace: "payments".to_owned(), target_resource: "checkout".to_owned() }
        );
    }

    #[test]
    fn different_targets_lease_independently() {
        let manager = LeaseManager::new();
        let _a = manager.acquire("payments", "checkout").unwrap();
        let _b = manager.acquire("payments", "inventory").unwrap();
    }

    #[test]
    fn lease_releases_on_guard_drop() {
        let manager = LeaseManager::new();
        {
            let _guard = manager.acquire("payments", "checkout").unwrap();
            assert!(manager.is_leased("payments", "checkout"));
        }
        assert!(!manager.is_leased("payments", "checkout"));
    }
}
