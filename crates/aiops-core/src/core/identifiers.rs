// aiops-core/src/core/identifiers.rs
// ============================================================================
// Module: Incident Pipeline Identifiers
// Description: Canonical opaque identifiers for incidents, evidence,
//              hypotheses, remediation actions, and graph entities.
// Purpose: Provide strongly typed, serializable identifiers with stable wire
//          forms so that callers cannot cross-wire an EvidenceId with an
//          IncidentId at compile time.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every entity in the pipeline is addressed by an opaque identifier rather
//! than a bare `String` or `u64`, so that the type system rejects mixing up,
//! say, a `HypothesisId` with an `ActionId`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Macro
// ============================================================================

macro_rules! opaque_string_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        ///
        /// # Invariants
        /// - Opaque UTF-8 string; no normalization or validation is applied by this type.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Creates a new `", stringify!($name), "`.")]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

opaque_string_id!(IncidentId, "Incident identifier, unique within a tenant.");
opaque_string_id!(EvidenceId, "Evidence record identifier.");
opaque_string_id!(HypothesisId, "Hypothesis identifier, unique within an incident.");
opaque_string_id!(ActionId, "Remediation action identifier.");
opaque_string_id!(VerificationId, "Verification result identifier.");
opaque_string_id!(RuleId, "Built-in or configured rule identifier.");
opaque_string_id!(NodeId, "Evidence graph node identifier, derived from its entity key.");
opaque_string_id!(EdgeId, "Evidence graph edge identifier, derived from its endpoints and relation.");
opaque_string_id!(ClusterId, "Cluster identifier the incident was observed in.");
opaque_string_id!(CollectorId, "Evidence collector registry key.");
opaque_string_id!(IdempotencyKey, "Remediation action idempotency key: (incident, action_type, target, params hash).");

#[cfg(test)]
#[allow(
    clippy::expect_used,
    reason = "test-only assertions are permitted to use expect for clearer failure messages"
)]
mod tests {
    use super::IncidentId;

    #[test]
    fn round_trips_through_display_and_as_str() {
        let id = IncidentId::new("inc-42");
        assert_eq!(id.as_str(), "inc-42");
        assert_eq!(id.to_string(), "inc-42");
    }

    #[test]
    fn distinct_ids_are_distinguishable_by_type() {
        let incident = IncidentId::new("shared-key");
        let serialized = serde_json::to_string(&incident).expect("id serializes as a string");
        assert_eq!(serialized, "\"shared-key\"");
    }
}
