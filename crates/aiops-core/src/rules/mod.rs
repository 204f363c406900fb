// aiops-core/src/rules/mod.rs
// ============================================================================
// Module: Rules Engine (C3)
// Description: Signal extraction, the built-in rule table, and hypothesis
//              ranking.
// Purpose: The rules engine's public surface: `extract_signals` +
//          `built_in_rules` + `evaluate_rules` is the whole C3 pipeline from
//          evidence to ranked hypotheses.
// Dependencies: tri-logic, crate::core
// ============================================================================

//! ## Overview
//! C3 in three steps: [`extraction::extract_signals`] reduces an incident's
//! evidence into a [`crate::core::evidence::SignalMap`] plus provenance;
//! [`library::built_in_rules`] builds the declarative rule table (§4.3);
//! [`ranking::evaluate_rules`] evaluates that table against the signal map
//! and returns ranked [`crate::core::hypothesis::Hypothesis`] records.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod extraction;
pub mod library;
pub mod predicate;
pub mod ranking;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use extraction::extract_signals;
pub use extraction::SignalProvenance;
pub use library::built_in_rules;
pub use library::RuleDefinition;
pub use library::RuleThresholds;
pub use predicate::SignalPredicate;
pub use ranking::compute_confidence;
pub use ranking::evaluate_rules;
pub use ranking::CategoryWeights;
pub use ranking::FALLBACK_CONFIDENCE;
