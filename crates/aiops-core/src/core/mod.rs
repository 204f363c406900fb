// aiops-core/src/core/mod.rs
// ============================================================================
// Module: Incident Pipeline Core Types
// Description: Canonical domain schema for incidents, evidence, hypotheses,
//              remediation actions, verification results, and the evidence
//              graph.
// Purpose: Provide stable, serializable types that are the source of truth
//          shared by the rules engine, policy gate, workflow, and every
//          storage/CLI crate built on top of them.
// Dependencies: serde, tri-logic, bigdecimal, sha2
// ============================================================================

//! ## Overview
//! These types define the incident, evidence, hypothesis, remediation
//! action, verification, and evidence-graph schema (§3). They are the
//! canonical source of truth for the rules engine (`crate::rules`), policy
//! gate (`crate::policy`), and workflow state machine (`crate::workflow`).

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod evidence;
pub mod graph;
pub mod hypothesis;
pub mod identifiers;
pub mod incident;
pub mod remediation;
pub mod summary;
pub mod time;
pub mod verification;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use evidence::ClusterEventReason;
pub use evidence::ContainerReason;
pub use evidence::DeployHistoryData;
pub use evidence::Evidence;
pub use evidence::EvidenceData;
pub use evidence::EvidenceSource;
pub use evidence::EvidenceType;
pub use evidence::HpaStateData;
pub use evidence::LogsPatternData;
pub use evidence::MetricName;
pub use evidence::MetricSampleData;
pub use evidence::NodeStateData;
pub use evidence::NumericComparator;
pub use evidence::PodStateData;
pub use evidence::SignalKey;
pub use evidence::SignalMap;
pub use evidence::SignalValue;
pub use evidence::TimeWindow;
pub use evidence::compare_numeric;
pub use graph::AttributeValue;
pub use graph::EntityAttributes;
pub use graph::EntityKey;
pub use graph::EntityKind;
pub use graph::EvidenceLink;
pub use graph::GraphEdge;
pub use graph::GraphNode;
pub use graph::RelationKind;
pub use graph::Subgraph;
pub use graph::MAX_SUBGRAPH_DEPTH;
pub use graph::merge_attributes;
pub use hypothesis::Category;
pub use hypothesis::GeneratedBy;
pub use hypothesis::Hypothesis;
pub use hypothesis::enrich;
pub use identifiers::ActionId;
pub use identifiers::ClusterId;
pub use identifiers::CollectorId;
pub use identifiers::EdgeId;
pub use identifiers::EvidenceId;
pub use identifiers::HypothesisId;
pub use identifiers::IdempotencyKey;
pub use identifiers::IncidentId;
pub use identifiers::NodeId;
pub use identifiers::RuleId;
pub use identifiers::VerificationId;
pub use incident::Incident;
pub use incident::IncidentStatus;
pub use incident::Severity;
pub use remediation::ActionStatus;
pub use remediation::ActionTemplate;
pub use remediation::ActionType;
pub use remediation::ExecutionResult;
pub use remediation::RemediationAction;
pub use remediation::RiskLevel;
pub use remediation::derive_idempotency_key;
pub use summary::SafeSummary;
pub use time::Timestamp;
pub use verification::VerificationMetrics;
pub use verification::VerificationResult;
pub use verification::evaluate_metrics_improved;
pub use verification::evaluate_success;
