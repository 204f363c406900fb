// tri-logic/src/requirement.rs
// ============================================================================
// Module: Requirement Algebra
// Description: Boolean combinator tree over predicates, evaluated tri-state.
// Purpose: Let callers compose signal predicates with and/or/not/group and
//          evaluate the whole tree against a single evidence context.
// Dependencies: crate::tristate::{TriState, TriLogic, GroupCounts, RequirementTrace}
// ============================================================================

//! ## Overview
//! A `Requirement<P>` is a tree of boolean combinators over some predicate
//! type `P`. Leaves are evaluated against a single context through
//! [`EvaluateContext`]; the combinators are then folded using a [`TriLogic`]
//! table, so the same tree can be replayed under Kleene or Bochvar semantics
//! without rebuilding it.
//!
//! Unlike a row-batch evaluator, this crate evaluates one context at a time:
//! the caller is expected to hold a single incident's evidence/signal map
//! and ask whether a rule's requirement tree is satisfied against it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::tristate::GroupCounts;
use crate::tristate::RequirementTrace;
use crate::tristate::TriLogic;
use crate::tristate::TriState;

// ============================================================================
// SECTION: Evaluation Context
// ============================================================================

/// Evaluates a single predicate against a single evidence context
///
/// Implementors typically wrap a signal map (e.g. `HashMap<SignalKey,
/// SignalValue>`) and resolve `P` (a comparator/threshold description)
/// against it, returning `Unknown` when the referenced signal is absent.
pub trait EvaluateContext<P> {
    /// Evaluate `predicate` and return its tri-state truth value
    fn evaluate(&self, predicate: &P) -> TriState;
}

// ============================================================================
// SECTION: Requirement Tree
// ============================================================================

/// A boolean combinator tree over predicates of type `P`
///
/// # Invariants
/// - `RequireGroup(min, children)` is satisfied when at least `min` of
///   `children` are satisfied; see [`TriLogic::require_group`] for the exact
///   tri-state semantics when some children are unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Requirement<P> {
    /// A single leaf predicate
    Predicate(P),
    /// All children must be satisfied
    And(Vec<Requirement<P>>),
    /// At least one child must be satisfied
    Or(Vec<Requirement<P>>),
    /// The child must not be satisfied
    Not(Box<Requirement<P>>),
    /// At least `min` of the children must be satisfied
    RequireGroup(u8, Vec<Requirement<P>>),
    /// Always true, regardless of context
    Always,
    /// Always false, regardless of context
    Never,
}

impl<P> Requirement<P> {
    /// Builds an `And` node from an iterator of requirements
    pub fn all(children: impl IntoIterator<Item = Self>) -> Self {
        Self::And(children.into_iter().collect())
    }

    /// Builds an `Or` node from an iterator of requirements
    pub fn any(children: impl IntoIterator<Item = Self>) -> Self {
        Self::Or(children.into_iter().collect())
    }

    /// Builds a `Not` node
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Builds a `RequireGroup` node requiring at least `min` of `children`
    pub fn at_least(min: u8, children: impl IntoIterator<Item = Self>) -> Self {
        Self::RequireGroup(min, children.into_iter().collect())
    }

    /// Returns true if the tree is `Always`
    #[must_use]
    pub const fn is_trivially_satisfied(&self) -> bool {
        matches!(self, Self::Always)
    }

    /// Returns true if the tree is `Never`
    #[must_use]
    pub const fn is_trivially_unsatisfiable(&self) -> bool {
        matches!(self, Self::Never)
    }

    /// Total number of predicate leaves in the tree
    #[must_use]
    pub fn complexity(&self) -> usize {
        match self {
            Self::Predicate(_) | Self::Always | Self::Never => 1,
            Self::Not(inner) => inner.complexity(),
            Self::And(children) | Self::Or(children) => {
                children.iter().map(Self::complexity).sum()
            }
            Self::RequireGroup(_, children) => children.iter().map(Self::complexity).sum(),
        }
    }

    /// Evaluate the tree against `context`, folding with `logic`
    pub fn eval_tristate(
        &self,
        context: &impl EvaluateContext<P>,
        logic: &impl TriLogic,
    ) -> TriState {
        self.eval_tristate_with_trace(context, logic, &mut crate::tristate::NoopTrace)
    }

    /// Evaluate the tree against `context`, folding with `logic`, recording
    /// each predicate evaluation through `trace`
    pub fn eval_tristate_with_trace(
        &self,
        context: &impl EvaluateContext<P>,
        logic: &impl TriLogic,
        trace: &mut impl RequirementTrace<P>,
    ) -> TriState {
        match self {
            Self::Always => TriState::True,
            Self::Never => TriState::False,
            Self::Predicate(predicate) => {
                let result = context.evaluate(predicate);
                trace.on_predicate_evaluated(predicate, result);
                result
            }
            Self::Not(inner) => {
                let inner_result = inner.eval_tristate_with_trace(context, logic, trace);
                logic.not(inner_result)
            }
            Self::And(children) => children
                .iter()
                .map(|child| child.eval_tristate_with_trace(context, logic, trace))
                .fold(TriState::True, |acc, next| logic.and(acc, next)),
            Self::Or(children) => children
                .iter()
                .map(|child| child.eval_tristate_with_trace(context, logic, trace))
                .fold(TriState::False, |acc, next| logic.or(acc, next)),
            Self::RequireGroup(min, children) => {
                let results: Vec<TriState> = children
                    .iter()
                    .map(|child| child.eval_tristate_with_trace(context, logic, trace))
                    .collect();
                let counts = GroupCounts {
                    satisfied: results.iter().filter(|r| r.is_true()).count(),
                    unknown: results.iter().filter(|r| r.is_unknown()).count(),
                    total: results.len(),
                };
                logic.require_group(*min, counts)
            }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::Requirement;
    use crate::tristate::KleeneLogic;
    use crate::tristate::TriState;
    use crate::EvaluateContext;

    struct FixedContext;

    impl EvaluateContext<&'static str> for FixedContext {
        fn evaluate(&self, predicate: &&'static str) -> TriState {
            match *predicate {
                "true" => TriState::True,
                "false" => TriState::False,
                _ => TriState::Unknown,
            }
        }
    }

    #[test]
    fn and_is_false_closed_even_with_unknown() {
        let tree = Requirement::all([
            Requirement::Predicate("false"),
            Requirement::Predicate("unknown"),
        ]);
        assert_eq!(tree.eval_tristate(&FixedContext, &KleeneLogic), TriState::False);
    }

    #[test]
    fn and_is_unknown_when_no_operand_decides() {
        let tree = Requirement::all([
            Requirement::Predicate("true"),
            Requirement::Predicate("unknown"),
        ]);
        assert_eq!(tree.eval_tristate(&FixedContext, &KleeneLogic), TriState::Unknown);
    }

    #[test]
    fn or_is_true_closed_even_with_unknown() {
        let tree = Requirement::any([
            Requirement::Predicate("true"),
            Requirement::Predicate("unknown"),
        ]);
        assert_eq!(tree.eval_tristate(&FixedContext, &KleeneLogic), TriState::True);
    }

    #[test]
    fn not_flips_true_and_false_but_not_unknown() {
        assert_eq!(
            Requirement::Predicate("true")
                .negate()
                .eval_tristate(&FixedContext, &KleeneLogic),
            TriState::False
        );
        assert_eq!(
            Requirement::Predicate("unknown")
                .negate()
                .eval_tristate(&FixedContext, &KleeneLogic),
            TriState::Unknown
        );
    }

    #[test]
    fn require_group_needs_enough_definite_satisfactions() {
        let tree = Requirement::at_least(
            2,
            [
                Requirement::Predicate("true"),
                Requirement::Predicate("unknown"),
                Requirement::Predicate("false"),
            ],
        );
        assert_eq!(tree.eval_tristate(&FixedContext, &KleeneLogic), TriState::Unknown);

        let tree = Requirement::at_least(
            2,
            [
                Requirement::Predicate("true"),
                Requirement::Predicate("false"),
                Requirement::Predicate("false"),
            ],
        );
        assert_eq!(tree.eval_tristate(&FixedContext, &KleeneLogic), TriState::False);
    }

    #[test]
    fn complexity_counts_leaves() {
        let tree = Requirement::all([
            Requirement::Predicate("a"),
            Requirement::any([Requirement::Predicate("b"), Requirement::Predicate("c")]),
        ]);
        assert_eq!(tree.complexity(), 3);
    }
}
