// aiops-core/src/rules/ranking.rs
// ============================================================================
// Module: Rule Evaluation & Hypothesis Ranking
// Description: Evaluates the rule table against a signal map and ranks the
//              resulting hypotheses (§4.3).
// Purpose: Tie the requirement-tree evaluation, evidence provenance, and
//          category tie-break rules together into the rules engine's single
//          public entry point.
// Dependencies: tri-logic, crate::core::{evidence, hypothesis, identifiers},
//               crate::rules::{extraction, library, predicate}
// ============================================================================

//! ## Overview
//! [`evaluate_rules`] is the C3 entry point: given an incident's extracted
//! signal map and evidence provenance, it evaluates every rule in the table,
//! computes each fired rule's confidence via the §4.3 formula, assigns dense
//! ranks with the category tie-break, and falls back to a single
//! `category = unknown` hypothesis when no rule fires.
//!
//! **Supporting/contradicting evidence** (an Open Question the distilled
//! spec leaves unresolved — see `DESIGN.md`): a predicate leaf that
//! evaluates `True` contributes its provenance evidence to
//! `supporting_evidence_ids`; one that evaluates `False` contributes to
//! `contradicting_evidence_ids`. `Unknown` leaves contribute to neither. This
//! is deterministic, traceable to concrete evidence records, and consistent
//! with the spec's framing of "supporting" and "contradicting" as per-rule
//! predicate outcomes rather than a separate semantic judgment.
//!
//! **Category weight** (also an Open Question): the distilled spec names a
//! `category_weight` term in the ranking formula without a table of values.
//! This implementation defaults every category's weight to `1.0` (a neutral
//! multiplier), leaving `category_weight` as a caller-suppliable override
//! hook (`CategoryWeights`) for deployments that want to bias certain
//! categories up or down.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use tri_logic::LogicMode;
use tri_logic::RequirementTrace;
use tri_logic::TriState;

use crate::core::evidence::SignalMap;
use crate::core::hypothesis::Category;
use crate::core::hypothesis::GeneratedBy;
use crate::core::hypothesis::Hypothesis;
use crate::core::identifiers::EvidenceId;
use crate::core::identifiers::HypothesisId;
use crate::core::identifiers::IncidentId;
use crate::rules::extraction::SignalProvenance;
use crate::rules::library::RuleDefinition;
use crate::rules::predicate::SignalPredicate;

/// Per-category confidence multiplier override. Defaults to `1.0` for every
/// category (see module docs).
#[derive(Debug, Clone, Default)]
pub struct CategoryWeights(BTreeMap<String, f64>);

impl CategoryWeights {
    /// Builds a weight table with every category defaulting to `1.0`.
    #[must_use]
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Overrides the weight for `category`.
    pub fn set(&mut self, category: Category, weight: f64) {
        self.0.insert(format!("{category:?}"), weight);
    }

    /// Returns `category`'s weight, defaulting to `1.0`.
    #[must_use]
    pub fn weight_for(&self, category: Category) -> f64 {
        self.0.get(&format!("{category:?}")).copied().unwrap_or(1.0)
    }
}

/// The minimum confidence the no-rule-fired fallback hypothesis carries
/// (§4.3).
pub const FALLBACK_CONFIDENCE: f64 = 0.2;

// ============================================================================
// SECTION: Evidence Provenance Trace
// ============================================================================

/// Records which evidence supported or contradicted a fired rule's
/// predicates, by following each leaf predicate's tri-state result back to
/// the evidence that contributed its signal.
struct ProvenanceTrace<'a> {
    provenance: &'a SignalProvenance,
    supporting: BTreeSet<EvidenceId>,
    contradicting: BTreeSet<EvidenceId>,
}

impl<'a> ProvenanceTrace<'a> {
    fn new(provenance: &'a SignalProvenance) -> Self {
        Self { provenance, supporting: BTreeSet::new(), contradicting: BTreeSet::new() }
    }
}

impl RequirementTrace<SignalPredicate> for ProvenanceTrace<'_> {
    fn on_predicate_evaluated(&mut self, predicate: &SignalPredicate, result: TriState) {
        let key = predicate_key(predicate);
        let Some(evidence_ids) = self.provenance.get(key) else {
            return;
        };
        let bucket = match result {
            TriState::True => &mut self.supporting,
            TriState::False => &mut self.contradicting,
            TriState::Unknown => return,
        };
        bucket.extend(evidence_ids.iter().cloned());
    }
}

fn predicate_key(predicate: &SignalPredicate) -> &str {
    match predicate {
        SignalPredicate::IsTrue(key)
        | SignalPredicate::Contains { key, .. }
        | SignalPredicate::IntersectsAny { key, .. }
        | SignalPredicate::Compare { key, .. } => key,
    }
}

// ============================================================================
// SECTION: Confidence
// ============================================================================

/// Computes `confidence = base × category_weight × evidence_support_factor`
/// with contradicting evidence subtracting `0.1` each (§4.3), clamped to
/// `[0.0, 1.0]` for storage even though the raw support factor may exceed 1.0
/// before the final clamp.
#[must_use]
pub fn compute_confidence(
    base_confidence: f64,
    category_weight: f64,
    supporting_count: usize,
    contradicting_count: usize,
) -> f64 {
    let support_factor = (0.5 + 0.1 * supporting_count as f64).clamp(0.0, 1.2);
    let contradiction_penalty = 0.1 * contradicting_count as f64;
    (base_confidence * category_weight * support_factor - contradiction_penalty).clamp(0.0, 1.0)
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates every rule in `rules` against `signals`, ranks the resulting
/// hypotheses, and returns them in rank order (§4.3). Always returns at
/// least one hypothesis.
#[must_use]
pub fn evaluate_rules(
    incident_id: &IncidentId,
    signals: &SignalMap,
    provenance: &SignalProvenance,
    rules: &[RuleDefinition],
    weights: &CategoryWeights,
) -> Vec<Hypothesis> {
    let logic = LogicMode::Kleene;
    let mut candidates = Vec::new();

    for rule in rules {
        let mut trace = ProvenanceTrace::new(provenance);
        let status = rule.requirement.eval_tristate_with_trace(signals, &logic, &mut trace);
        if !status.is_true() {
            continue;
        }

        let supporting: Vec<EvidenceId> = trace.supporting.into_iter().collect();
        let contradicting: Vec<EvidenceId> = trace.contradicting.into_iter().collect();
        let confidence = compute_confidence(
            rule.base_confidence,
            weights.weight_for(rule.category),
            supporting.len(),
            contradicting.len(),
        );

        candidates.push(Hypothesis {
            id: HypothesisId::new(format!("{incident_id}:{}", rule.id)),
            incident_id: incident_id.clone(),
            category: rule.category,
            title: rule.name.to_owned(),
            description: format!("Rule \"{}\" matched the incident's signal map.", rule.name),
            confidence,
            rank: 0,
            supporting_evidence_ids: supporting,
            contradicting_evidence_ids: contradicting,
            recommended_actions: rule.recommended_actions.clone(),
            generated_by: GeneratedBy::Rules,
        });
    }

    if candidates.is_empty() {
        candidates.push(fallback_hypothesis(incident_id));
    }

    assign_dense_ranks(&mut candidates);
    candidates
}

/// Builds the no-rule-fired fallback hypothesis (§4.3).
fn fallback_hypothesis(incident_id: &IncidentId) -> Hypothesis {
    Hypothesis {
        id: HypothesisId::new(format!("{incident_id}:fallback-unknown")),
        incident_id: incident_id.clone(),
        category: Category::Unknown,
        title: "Unknown".to_owned(),
        description: "No built-in rule matched the incident's signal map.".to_owned(),
        confidence: FALLBACK_CONFIDENCE,
        rank: 1,
        supporting_evidence_ids: Vec::new(),
        contradicting_evidence_ids: Vec::new(),
        recommended_actions: Vec::new(),
        generated_by: GeneratedBy::Rules,
    }
}

/// Assigns dense ranks (`1..=N`, no gaps) by descending confidence, breaking
/// ties by category priority then by the order rules were declared in the
/// table (§4.3).
fn assign_dense_ranks(hypotheses: &mut [Hypothesis]) {
    let mut order: Vec<usize> = (0..hypotheses.len()).collect();
    order.sort_by(|&a, &b| {
        hypotheses[b]
            .confidence
            .partial_cmp(&hypotheses[a].confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| hypotheses[a].category.priority().cmp(&hypotheses[b].category.priority()))
            .then_with(|| a.cmp(&b))
    });
    for (rank, &index) in order.iter().enumerate() {
        hypotheses[index].rank = u32::try_from(rank + 1).unwrap_or(u32::MAX);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tuple/struct literal construction in tests only")]
mod tests {
    use super::evaluate_rules;
    use super::CategoryWeights;
    use super::compute_confidence;
    use crate::core::evidence::SignalMap;
    use crate::core::evidence::SignalValue;
    use crate::core::hypothesis::Category;
    use crate::core::identifiers::IncidentId;
    use crate::rules::extraction::SignalProvenance;
    use crate::rules::library::built_in_rules;
    use crate::rules::library::RuleThresholds;
    use std::collections::BTreeSet;

    #[test]
    fn no_matching_rule_yields_fallback_hypothesis() {
        let incident_id = IncidentId::new("inc-1");
        let signals = SignalMap::new();
        let provenance = SignalProvenance::new();
        let rules = built_in_rules(RuleThresholds::default());
        let hypotheses = evaluate_rules(&incident_id, &signals, &provenance, &rules, &CategoryWeights::neutral());
        assert_eq!(hypotheses.len(), 1);
        assert_eq!(hypotheses[0].category, Category::Unknown);
        assert_eq!(hypotheses[0].rank, 1);
    }

    #[test]
    fn oom_rule_fires_and_outranks_a_lower_confidence_rule() {
        let incident_id = IncidentId::new("inc-1");
        let mut signals = SignalMap::new();
        signals.set("memory_usage_ratio", SignalValue::Number(0.99));
        signals.set(
            "waiting_reasons",
            SignalValue::StringSet(BTreeSet::from(["CrashLoopBackOff".to_owned()])),
        );
        signals.set("has_recent_deploy", SignalValue::Bool(true));
        let provenance = SignalProvenance::new();
        let rules = built_in_rules(RuleThresholds::default());

        let hypotheses =
            evaluate_rules(&incident_id, &signals, &provenance, &rules, &CategoryWeights::neutral());
        assert!(hypotheses.len() >= 2);
        assert_eq!(hypotheses[0].rank, 1);
        assert_eq!(hypotheses[0].category, Category::MemoryExhaustion);
    }

    #[test]
    fn confidence_formula_matches_spec_example() {
        let confidence = compute_confidence(0.95, 1.0, 3, 0);
        assert!((confidence - 0.76).abs() < 1e-9);
    }

    #[test]
    fn contradicting_evidence_reduces_confidence() {
        let with_contradiction = compute_confidence(0.90, 1.0, 2, 2);
        let without_contradiction = compute_confidence(0.90, 1.0, 2, 0);
        assert!(with_contradiction < without_contradiction);
    }
}
