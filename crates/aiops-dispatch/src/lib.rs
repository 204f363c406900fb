// aiops-dispatch/src/lib.rs
// ============================================================================
// Module: AIOps Dispatch Library
// Description: Remediation executor: backend registry, target leasing, and
//              the idempotency/retry wrapper around action execution (C5).
// Dependencies: aiops-core, rand, thiserror
// ============================================================================

//! ## Overview
//! `aiops-dispatch` implements the remediation execution stage of the
//! incident pipeline (§4.5). [`registry::BackendRegistry`] resolves an
//! action to the [`aiops_core::ActionBackend`] that should run it;
//! [`lease::LeaseManager`] prevents two actions from racing on the same
//! target; [`executor::RemediationExecutor`] ties the two together with
//! idempotency caching and the bounded retry/backoff schedule.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod executor;
pub mod lease;
pub mod registry;

#[cfg(test)]
mod test_support;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use executor::DispatchError;
pub use executor::ExecutionDeadlines;
pub use executor::RemediationExecutor;

pub use lease::LeaseError;
pub use lease::LeaseGuard;
pub use lease::LeaseManager;

pub use registry::BackendRegistry;
pub use registry::BackendRegistryError;
pub use registry::scheme_for;
pub use registry::DEFAULT_SCHEME;
