// tri-logic/src/lib.rs
// ============================================================================
// Crate: tri-logic
// Description: Tri-state boolean requirement algebra for evidence-aware rule
//              evaluation.
// Purpose: Shared building block for `aiops-core`'s rules engine, where a
//          rule's trigger condition must degrade to `Unknown` rather than
//          silently pass when evidence is missing or still in flight.
// ============================================================================

//! # tri-logic
//!
//! Tri-state (`true` / `false` / `unknown`) boolean logic and a small
//! [`Requirement`] combinator tree for composing predicates with
//! `and`/`or`/`not`/`at_least` and evaluating them against a single evidence
//! context under a pluggable [`TriLogic`] table (strong Kleene by default).
//!
//! This crate intentionally evaluates one context at a time. It does not
//! provide batch/row evaluation over collections of contexts; callers that
//! need to evaluate many incidents evaluate the same tree once per incident.

pub mod requirement;
pub mod tristate;

pub use requirement::EvaluateContext;
pub use requirement::Requirement;
pub use tristate::BochvarLogic;
pub use tristate::GroupCounts;
pub use tristate::KleeneLogic;
pub use tristate::LogicMode;
pub use tristate::NoopTrace;
pub use tristate::RequirementTrace;
pub use tristate::TriLogic;
pub use tristate::TriState;

/// Builds a [`Requirement`] tree from a terse combinator syntax
///
/// ```ignore
/// requirement!(and![
///     pred("cpu_saturated"),
///     or![pred("oom_killed"), pred("restart_loop")],
/// ]);
/// ```
#[macro_export]
macro_rules! requirement {
    (pred($p:expr)) => {
        $crate::Requirement::Predicate($p)
    };
    (and![$($child:tt),* $(,)?]) => {
        $crate::Requirement::all([$($crate::requirement!($child)),*])
    };
    (or![$($child:tt),* $(,)?]) => {
        $crate::Requirement::any([$($crate::requirement!($child)),*])
    };
    (not($child:tt)) => {
        $crate::Requirement::negate($crate::requirement!($child))
    };
    (at_least($min:expr, [$($child:tt),* $(,)?])) => {
        $crate::Requirement::at_least($min, [$($crate::requirement!($child)),*])
    };
}

/// Small helpers for building common requirement shapes without the macro
pub mod convenience {
    use crate::Requirement;

    /// A requirement tree that is always satisfied
    #[must_use]
    pub const fn always<P>() -> Requirement<P> {
        Requirement::Always
    }

    /// A requirement tree that is never satisfied
    #[must_use]
    pub const fn never<P>() -> Requirement<P> {
        Requirement::Never
    }

    /// A single-predicate requirement tree
    pub fn single<P>(predicate: P) -> Requirement<P> {
        Requirement::Predicate(predicate)
    }
}

#[cfg(test)]
mod tests {
    use crate::tristate::KleeneLogic;
    use crate::EvaluateContext;
    use crate::Requirement;
    use crate::TriState;

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
    fn macro_builds_equivalent_tree_to_manual_construction() {
        let via_macro: Requirement<&'static str> = requirement!(and![
            pred("true"),
            or![pred("false"), pred("true")],
        ]);
        let manual = Requirement::all([
            Requirement::Predicate("true"),
            Requirement::any([Requirement::Predicate("false"), Requirement::Predicate("true")]),
        ]);
        assert_eq!(
            via_macro.eval_tristate(&FixedContext, &KleeneLogic),
            manual.eval_tristate(&FixedContext, &KleeneLogic)
        );
        assert_eq!(via_macro.eval_tristate(&FixedContext, &KleeneLogic), TriState::True);
    }

    #[test]
    fn convenience_always_and_never_are_trivial() {
        let t: Requirement<&'static str> = crate::convenience::always();
        let f: Requirement<&'static str> = crate::convenience::never();
        assert!(t.is_trivially_satisfied());
        assert!(f.is_trivially_unsatisfiable());
    }
}
