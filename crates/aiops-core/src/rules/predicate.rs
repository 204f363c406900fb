// aiops-core/src/rules/predicate.rs
// ============================================================================
// Module: Rule Predicates
// Description: Leaf predicates a rule's requirement tree is built from, and
//              their tri-state evaluation against a signal map.
// Purpose: Bridge tri-logic's `Requirement<P>` combinator tree to the
//          incident signal map (§4.3).
// Dependencies: tri-logic, crate::core::evidence
// ============================================================================

//! ## Overview
//! A [`SignalPredicate`] names one signal-map lookup (a boolean flag, a
//! string-set membership test, or a numeric threshold comparison). Rules
//! compose these into a [`tri_logic::Requirement`] tree; evaluating the tree
//! against a [`SignalMap`] never sees a raw signal name go unevaluated
//! without degrading missing evidence to `Unknown` (§4.3).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use tri_logic::EvaluateContext;
use tri_logic::TriState;

use crate::core::evidence::NumericComparator;
use crate::core::evidence::SignalKey;
use crate::core::evidence::SignalMap;

// ============================================================================
// SECTION: Signal Predicate
// ============================================================================

/// A single signal-map lookup, the leaf type of a rule's requirement tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SignalPredicate {
    /// A boolean signal must be true (e.g. `has_recent_deploy`).
    IsTrue(SignalKey),
    /// A string-set signal must contain `member` (e.g. `CrashLoopBackOff ∈
    /// waiting_reasons`).
    Contains {
        /// The signal key.
        key: SignalKey,
        /// The member that must be present.
        member: String,
    },
    /// A string-set signal must intersect any of `members` (e.g. `{ImagePullBackOff,
    /// ErrImagePull} ∩ waiting_reasons ≠ ∅`).
    IntersectsAny {
        /// The signal key.
        key: SignalKey,
        /// Candidate members; satisfied if any is present in the set.
        members: Vec<String>,
    },
    /// A numeric signal must satisfy `comparator threshold` (e.g.
    /// `memory_usage_ratio ≥ 0.95`).
    Compare {
        /// The signal key.
        key: SignalKey,
        /// The comparator applied.
        comparator: NumericComparator,
        /// The threshold compared against.
        threshold: f64,
    },
}

impl EvaluateContext<SignalPredicate> for SignalMap {
    fn evaluate(&self, predicate: &SignalPredicate) -> TriState {
        match predicate {
            SignalPredicate::IsTrue(key) => self.is_true(key),
            SignalPredicate::Contains { key, member } => self.contains(key, member),
            SignalPredicate::IntersectsAny { key, members } => {
                let members: Vec<&str> = members.iter().map(String::as_str).collect();
                self.intersects_any(key, &members)
            }
            SignalPredicate::Compare { key, comparator, threshold } => {
                self.compare(key, *comparator, *threshold)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SignalPredicate;
    use crate::core::evidence::NumericComparator;
    use crate::core::evidence::SignalMap;
    use crate::core::evidence::SignalValue;
    use std::collections::BTreeSet;
    use tri_logic::EvaluateContext;
    use tri_logic::TriState;

    #[test]
    fn contains_predicate_reads_string_set_signal() {
        let mut signals = SignalMap::new();
        signals.set(
            "waiting_reasons",
            SignalValue::StringSet(BTreeSet::from(["OOMKilled".to_owned()])),
        );
        let predicate =
            SignalPredicate::Contains { key: "waiting_reasons".to_owned(), member: "OOMKilled".to_owned() };
        assert_eq!(signals.evaluate(&predicate), TriState::True);
    }

    #[test]
    fn compare_predicate_is_unknown_when_signal_absent() {
        let signals = SignalMap::new();
        let predicate = SignalPredicate::Compare {
            key: "memory_usage_ratio".to_owned(),
            comparator: NumericComparator::GreaterThanOrEqual,
            threshold: 0.95,
        };
        assert_eq!(signals.evaluate(&predicate), TriState::Unknown);
    }

    #[test]
    fn intersects_any_matches_either_member() {
        let mut signals = SignalMap::new();
        signals.set(
            "waiting_reasons",
            SignalValue::StringSet(BTreeSet::from(["ErrImagePull".to_owned()])),
        );
        let predicate = SignalPredicate::IntersectsAny {
            key: "waiting_reasons".to_owned(),
            members: vec!["ImagePullBackOff".to_owned(), "ErrImagePull".to_owned()],
        };
        assert_eq!(signals.evaluate(&predicate), TriState::True);
    }
}
