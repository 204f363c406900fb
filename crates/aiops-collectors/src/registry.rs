// aiops-collectors/src/registry.rs
// ============================================================================
// Module: Collector Registry
// Description: Registry for built-in and external evidence collectors.
// Purpose: Route evidence collection by collector identifier with policy
//          checks, and aggregate the registered set into one collection pass.
// Dependencies: aiops-core, thiserror
// ============================================================================

//! ## Overview
//! The collector registry resolves evidence collection by collector
//! identifier and enforces allowlist/denylist access policy, mirroring the
//! structure of a provider-style plugin registry (§4.2, §9 "Plugin
//! collectors"). A collection pass runs every policy-allowed, registered
//! collector against one [`CollectionContext`] and reports both the gathered
//! evidence and any per-collector failures, rather than failing the whole
//! pass when a single collector family is unavailable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use aiops_core::CollectionContext;
use aiops_core::CollectorError;
use aiops_core::CollectorRegistryError;
use aiops_core::Evidence;
use aiops_core::EvidenceCollector;
use thiserror::Error;

// ============================================================================
// SECTION: Access Policy
// ============================================================================

/// Access policy controlling which collectors may run.
///
/// # Invariants
/// - `denylist` overrides `allowlist` when both are present.
/// - If `allowlist` is `None`, all collectors are allowed unless denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorAccessPolicy {
    /// Optional allowlist of collector identifiers.
    pub allowlist: Option<BTreeSet<String>>,
    /// Explicit denylist of collector identifiers.
    pub denylist: BTreeSet<String>,
}

impl CollectorAccessPolicy {
    /// Returns a policy that permits all collectors.
    #[must_use]
    pub const fn allow_all() -> Self {
        Self {
            allowlist: None,
            denylist: BTreeSet::new(),
        }
    }

    /// Returns true when the collector is allowed by policy.
    #[must_use]
    pub fn is_allowed(&self, collector_id: &str) -> bool {
        if self.denylist.contains(collector_id) {
            return false;
        }
        if let Some(allowlist) = &self.allowlist {
            return allowlist.contains(collector_id);
        }
        true
    }
}

impl Default for CollectorAccessPolicy {
    fn default() -> Self {
        Self::allow_all()
    }
}

// ============================================================================
// SECTION: Dispatch Error
// ============================================================================

/// The error a single named dispatch through the registry can fail with.
#[derive(Debug, Error)]
pub enum CollectorDispatchError {
    /// The collector is not registered, or is registered but denied.
    #[error(transparent)]
    Registry(#[from] CollectorRegistryError),
    /// The collector itself failed to produce anything.
    #[error(transparent)]
    Collector(#[from] CollectorError),
}

/// Reports collector identifiers a scenario required but the registry could
/// not satisfy, mirroring the evidence graph's fail-closed posture on
/// missing inputs (§4.2, §7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorMissingError {
    /// Collector identifiers that are either unregistered or denied.
    pub missing_collectors: Vec<String>,
    /// Set when at least one missing collector exists but was denied by
    /// policy rather than simply unregistered.
    pub blocked_by_policy: bool,
}

// ============================================================================
// SECTION: Collection Report
// ============================================================================

/// The outcome of running every policy-allowed registered collector against
/// one [`CollectionContext`] (§4.2).
///
/// # Invariants
/// - A collector family that fails does not prevent other families from
///   running; its failure is recorded in `failures`, not propagated.
#[derive(Debug, Default)]
pub struct CollectionReport {
    /// Evidence gathered across every collector that produced some.
    pub evidence: Vec<Evidence>,
    /// Per-collector failures, keyed by collector id.
    pub failures: Vec<(String, CollectorError)>,
}

impl CollectionReport {
    /// Returns true when no collector produced any evidence at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.evidence.is_empty()
    }
}

// ============================================================================
// SECTION: Collector Registry
// ============================================================================

/// Evidence collector registry with policy enforcement.
///
/// # Invariants
/// - Collector identifiers are unique within the registry.
/// - Access policy is enforced on every dispatch.
/// - Registered collectors are `Send + Sync` and stored behind trait objects.
pub struct CollectorRegistry {
    /// Collector implementations keyed by collector identifier.
    collectors: BTreeMap<String, Box<dyn EvidenceCollector + Send + Sync>>,
    /// Access control policy for collector usage.
    policy: CollectorAccessPolicy,
}

impl CollectorRegistry {
    /// Creates a new, empty registry with the given policy.
    #[must_use]
    pub fn new(policy: CollectorAccessPolicy) -> Self {
        Self {
            collectors: BTreeMap::new(),
            policy,
        }
    }

    /// Registers a new collector under the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorRegistryError`] when the identifier is already
    /// registered; the variant is reused here to signal registration-time
    /// conflicts, not runtime dispatch failures.
    pub fn register_collector(
        &mut self,
        collector_id: impl Into<String>,
        collector: impl EvidenceCollector + Send + Sync + 'static,
    ) -> Result<(), CollectorRegistryError> {
        let collector_id = collector_id.into();
        if self.collectors.contains_key(&collector_id) {
            return Err(CollectorRegistryError::NotRegistered(format!(
                "collector already registered: {collector_id}"
            )));
        }
        self.collectors.insert(collector_id, Box::new(collector));
        Ok(())
    }

    /// Returns the configured policy.
    #[must_use]
    pub const fn policy(&self) -> &CollectorAccessPolicy {
        &self.policy
    }

    /// Dispatches to the single named collector.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorDispatchError::Registry`] when `collector_id` is
    /// unregistered or denied, or [`CollectorDispatchError::Collector`] when
    /// the collector itself fails to produce anything.
    pub fn collect_named(
        &self,
        collector_id: &str,
        ctx: &CollectionContext,
    ) -> Result<Vec<Evidence>, CollectorDispatchError> {
        if !self.policy.is_allowed(collector_id) {
            return Err(CollectorRegistryError::Denied(collector_id.to_owned()).into());
        }
        let Some(collector) = self.collectors.get(collector_id) else {
            return Err(CollectorRegistryError::NotRegistered(collector_id.to_owned()).into());
        };
        Ok(collector.collect(ctx)?)
    }

    /// Runs every policy-allowed, registered collector against `ctx`,
    /// aggregating evidence and per-collector failures into one report
    /// rather than failing the whole pass on a single collector's error
    /// (§4.2, §7's partial-evidence propagation policy).
    #[must_use]
    pub fn collect_all(&self, ctx: &CollectionContext) -> CollectionReport {
        let mut report = CollectionReport::default();
        for (collector_id, collector) in &self.collectors {
            if !self.policy.is_allowed(collector_id) {
                continue;
            }
            match collector.collect(ctx) {
                Ok(evidence) => report.evidence.extend(evidence),
                Err(err) => report.failures.push((collector_id.clone(), err)),
            }
        }
        report
    }

    /// Checks that every collector identifier in `required` is both
    /// registered and allowed by policy.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorMissingError`] listing every identifier that is
    /// either unregistered or denied.
    pub fn validate_collectors(&self, required: &BTreeSet<String>) -> Result<(), CollectorMissingError> {
        let mut missing = Vec::new();
        let mut blocked_by_policy = false;
        for collector_id in required {
            let registered = self.collectors.contains_key(collector_id);
            let allowed = self.policy.is_allowed(collector_id);
            if !registered || !allowed {
                missing.push(collector_id.clone());
                if registered && !allowed {
                    blocked_by_policy = true;
                }
            }
        }
        if missing.is_empty() {
            return Ok(());
        }
        Err(CollectorMissingError {
            missing_collectors: missing,
            blocked_by_policy,
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test setup only")]
mod tests {
    use aiops_core::ClusterId;
    use aiops_core::IncidentId;

    use super::*;

    struct StubCollector {
        id: &'static str,
        fails: bool,
    }

    impl EvidenceCollector for StubCollector {
        fn name(&self) -> &str {
            self.id
        }

        fn collect(&self, _ctx: &CollectionContext) -> Result<Vec<Evidence>, CollectorError> {
            if self.fails {
                return Err(CollectorError::Backend {
                    collector: self.id.to_owned(),
                    message: "stub failure".to_owned(),
                });
            }
            Ok(Vec::new())
        }
    }

    fn sample_ctx() -> CollectionContext {
        CollectionContext {
            incident_id: IncidentId::new("inc-1"),
            cluster: ClusterId::new("cluster-1"),
            namespace: "payments".to_owned(),
            service: Some("checkout".to_owned()),
            time_window: aiops_core::TimeWindow {
                start: aiops_core::Timestamp::UnixMillis(0),
                end: aiops_core::Timestamp::UnixMillis(1),
            },
        }
    }

    #[test]
    fn denied_collector_is_rejected_on_named_dispatch() {
        let mut policy = CollectorAccessPolicy::allow_all();
        policy.denylist.insert("logs".to_owned());
        let mut registry = CollectorRegistry::new(policy);
        registry
            .register_collector("logs", StubCollector { id: "logs", fails: false })
            .expect("register should succeed");

        let result = registry.collect_named("logs", &sample_ctx());
        assert!(matches!(result, Err(CollectorDispatchError::Registry(CollectorRegistryError::Denied(_)))));
    }

    #[test]
    fn unregistered_collector_is_rejected() {
        let registry = CollectorRegistry::new(CollectorAccessPolicy::allow_all());
        let result = registry.collect_named("missing", &sample_ctx());
        assert!(matches!(
            result,
            Err(CollectorDispatchError::Registry(CollectorRegistryError::NotRegistered(_)))
        ));
    }

    #[test]
    fn collect_all_aggregates_failures_without_short_circuiting() {
        let mut registry = CollectorRegistry::new(CollectorAccessPolicy::allow_all());
        registry
            .register_collector("cluster-state", StubCollector { id: "cluster-state", fails: false })
            .expect("register should succeed");
        registry
            .register_collector("metrics", StubCollector { id: "metrics", fails: true })
            .expect("register should succeed");

        let report = registry.collect_all(&sample_ctx());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "metrics");
    }

    #[test]
    fn validate_collectors_reports_missing_and_blocked() {
        let mut policy = CollectorAccessPolicy::allow_all();
        policy.denylist.insert("metrics".to_owned());
        let mut registry = CollectorRegistry::new(policy);
        registry
            .register_collector("metrics", StubCollector { id: "metrics", fails: false })
            .expect("register should succeed");

        let required: BTreeSet<String> = ["metrics".to_owned(), "deploy-diff".to_owned()].into_iter().collect();
        let err = registry.validate_collectors(&required).expect_err("should report missing");
        assert!(err.blocked_by_policy);
        assert_eq!(err.missing_collectors.len(), 2);
    }
}
