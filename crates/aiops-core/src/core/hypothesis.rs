// aiops-core/src/core/hypothesis.rs
// ============================================================================
// Module: Hypothesis
// Description: Ranked causal hypotheses produced by the rules engine (C3).
// Purpose: Canonical hypothesis record plus the category priority table used
//          to break ranking ties.
// Dependencies: serde, crate::core::identifiers
// ============================================================================

//! ## Overview
//! A hypothesis is the rules engine's best guess at the incident's root
//! cause, with a dense rank within the incident (rank 1 = highest-ranked) and
//! a confidence score. LLM enrichment, if configured, may rewrite `title` and
//! `description` only — rank, confidence, category, and evidence links are
//! immutable across enrichment; see [`enrich`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::EvidenceId;
use crate::core::identifiers::HypothesisId;
use crate::core::identifiers::IncidentId;
use crate::core::remediation::ActionTemplate;

// ============================================================================
// SECTION: Category
// ============================================================================

/// The root-cause category a hypothesis is classified into.
///
/// # Invariants
/// - [`Category::priority`] defines the tie-break order used when two
///   hypotheses share a confidence score (§4.3): lower priority index wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// A recent deployment correlates with the failure.
    BadDeploy,
    /// An external dependency appears to be failing.
    ExternalDependency,
    /// The workload is being OOM-killed or approaching its memory limit.
    MemoryExhaustion,
    /// The container image cannot be pulled or started.
    ImageIssue,
    /// The workload is scaled to its HPA maximum and still saturated.
    ScalingLimit,
    /// The underlying node or infrastructure is unhealthy.
    Infrastructure,
    /// Configuration drifted between expected and observed state.
    ConfigDrift,
    /// A networking issue (DNS, policy, connectivity).
    Network,
    /// Resource contention with co-located workloads.
    ResourceContention,
    /// No rule matched; root cause is unknown.
    Unknown,
}

impl Category {
    /// Tie-break priority order from §4.3: lower value wins ties.
    const PRIORITY_ORDER: [Self; 10] = [
        Self::MemoryExhaustion,
        Self::ImageIssue,
        Self::BadDeploy,
        Self::Infrastructure,
        Self::ScalingLimit,
        Self::ExternalDependency,
        Self::ConfigDrift,
        Self::Network,
        Self::ResourceContention,
        Self::Unknown,
    ];

    /// Returns this category's tie-break priority index (lower wins).
    #[must_use]
    pub fn priority(self) -> usize {
        Self::PRIORITY_ORDER
            .iter()
            .position(|candidate| *candidate == self)
            .unwrap_or(Self::PRIORITY_ORDER.len())
    }
}

// ============================================================================
// SECTION: Generated By
// ============================================================================

/// Provenance of a hypothesis's `title`/`description` text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratedBy {
    /// Produced entirely by the rules engine.
    Rules,
    /// Rules-engine ranking, with LLM-rewritten `title`/`description`.
    RulesPlusLlm,
}

// ============================================================================
// SECTION: Hypothesis
// ============================================================================

/// A ranked causal hypothesis for an incident.
///
/// # Invariants
/// - `rank` is a dense permutation of `1..=N` within an incident (no gaps, no
///   repeats).
/// - `confidence` lies in `[0.0, 1.0]`.
/// - LLM enrichment may rewrite `title`/`description` and `generated_by`
///   only; see [`enrich`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    /// Hypothesis identifier.
    pub id: HypothesisId,
    /// Owning incident.
    pub incident_id: IncidentId,
    /// Root-cause category.
    pub category: Category,
    /// Human-readable title.
    pub title: String,
    /// Human-readable description.
    pub description: String,
    /// Confidence score in `[0, 1]`.
    pub confidence: f64,
    /// Dense rank within the incident; 1 = highest-ranked.
    pub rank: u32,
    /// Evidence records that support this hypothesis.
    pub supporting_evidence_ids: Vec<EvidenceId>,
    /// Evidence records that contradict this hypothesis.
    pub contradicting_evidence_ids: Vec<EvidenceId>,
    /// Candidate remediation action templates, in preference order.
    pub recommended_actions: Vec<ActionTemplate>,
    /// Provenance of `title`/`description`.
    pub generated_by: GeneratedBy,
}

/// Rewrites `title`/`description` of `hypothesis` via `rewrite`, leaving
/// `rank`, `confidence`, `category`, evidence links, and
/// `recommended_actions` untouched, and sets `generated_by` to
/// [`GeneratedBy::RulesPlusLlm`].
///
/// This is the sole seam through which an LLM enrichment step may influence
/// a hypothesis (§4.3, §9 "LLM path isolation"). No LLM client is
/// implemented here; `rewrite` defaults to the identity function when no
/// enrichment is configured.
pub fn enrich(
    mut hypothesis: Hypothesis,
    rewrite: impl FnOnce(&str, &str) -> (String, String),
) -> Hypothesis {
    let (title, description) = rewrite(&hypothesis.title, &hypothesis.description);
    hypothesis.title = title;
    hypothesis.description = description;
    hypothesis.generated_by = GeneratedBy::RulesPlusLlm;
    hypothesis
}

#[cfg(test)]
mod tests {
    use super::enrich;
    use super::Category;
    use super::GeneratedBy;
    use super::Hypothesis;
    use crate::core::identifiers::HypothesisId;
    use crate::core::identifiers::IncidentId;

    fn sample() -> Hypothesis {
        Hypothesis {
            id: HypothesisId::new("hyp-1"),
            incident_id: IncidentId::new("inc-1"),
            category: Category::MemoryExhaustion,
            title: "OOM".to_owned(),
            description: "pod was OOM-killed".to_owned(),
            confidence: 0.95,
            rank: 1,
            supporting_evidence_ids: Vec::new(),
            contradicting_evidence_ids: Vec::new(),
            recommended_actions: Vec::new(),
            generated_by: GeneratedBy::Rules,
        }
    }

    #[test]
    fn category_priority_orders_memory_exhaustion_first() {
        assert_eq!(Category::MemoryExhaustion.priority(), 0);
        assert!(Category::MemoryExhaustion.priority() < Category::ImageIssue.priority());
        assert!(Category::Unknown.priority() > Category::ResourceContention.priority());
    }

    #[test]
    fn enrich_only_touches_title_description_and_provenance() {
        let original = sample();
        let enriched = enrich(original.clone(), |title, description| {
            (format!("{title} (enriched)"), description.to_owned())
        });

        assert_eq!(enriched.title, "OOM (enriched)");
        assert_eq!(enriched.generated_by, GeneratedBy::RulesPlusLlm);
        assert_eq!(enriched.confidence, original.confidence);
        assert_eq!(enriched.rank, original.rank);
        assert_eq!(enriched.category, original.category);
        assert_eq!(enriched.recommended_actions, original.recommended_actions);
    }
}
