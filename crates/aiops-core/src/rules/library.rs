// aiops-core/src/rules/library.rs
// ============================================================================
// Module: Rule Library
// Description: Declarative rule definitions and the built-in rule table.
// Purpose: Pair a requirement tree over signal predicates with the
//          hypothesis template it produces when satisfied (§4.3).
// Dependencies: tri-logic, crate::core::{hypothesis, remediation}, crate::rules::predicate
// ============================================================================

//! ## Overview
//! A rule is declarative, deterministic, and order-independent: a
//! [`tri_logic::Requirement<SignalPredicate>`] tree plus the
//! [`Category`]/base-confidence/recommended-action template it contributes
//! when the tree evaluates `True` against an incident's signal map. The
//! built-in library covers the six rules named in §4.3; operators may extend
//! it (the rule table is a plain `Vec`, not a hardcoded match).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use tri_logic::Requirement;

use crate::core::evidence::NumericComparator;
use crate::core::hypothesis::Category;
use crate::core::identifiers::RuleId;
use crate::core::remediation::ActionTemplate;
use crate::core::remediation::ActionType;
use crate::core::remediation::RiskLevel;
use crate::rules::predicate::SignalPredicate;

// ============================================================================
// SECTION: Rule Thresholds
// ============================================================================

/// Numeric thresholds referenced by the built-in rules but left
/// unspecified by name in §4.3 (`τ`, `τ_lat`); tunable per deployment
/// through `aiops-config`, defaulting to the values below.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleThresholds {
    /// `τ`: error-log match rate (per minute) above which `External dep`
    /// considers the error spike significant.
    pub error_log_rate: f64,
    /// `τ_lat`: p99 latency (seconds) above which `Scale limit` considers
    /// the workload latency-degraded.
    pub latency_p99: f64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self { error_log_rate: 5.0, latency_p99: 1.0 }
    }
}

// ============================================================================
// SECTION: Rule Definition
// ============================================================================

/// A single rule: a requirement tree over signal predicates plus the
/// hypothesis template it contributes when satisfied.
#[derive(Debug, Clone)]
pub struct RuleDefinition {
    /// Stable rule identifier.
    pub id: RuleId,
    /// Human-readable rule name (matches §4.3's table).
    pub name: &'static str,
    /// The requirement tree evaluated against the incident's signal map.
    pub requirement: Requirement<SignalPredicate>,
    /// The hypothesis category this rule produces.
    pub category: Category,
    /// The base confidence before the §4.3 ranking formula's weighting.
    pub base_confidence: f64,
    /// Recommended remediation action templates.
    pub recommended_actions: Vec<ActionTemplate>,
}

// ============================================================================
// SECTION: Built-In Rule Table
// ============================================================================

/// Builds the built-in rule table (§4.3's table, at minimum).
#[must_use]
pub fn built_in_rules(thresholds: RuleThresholds) -> Vec<RuleDefinition> {
    vec![
        RuleDefinition {
            id: RuleId::new("bad-deploy"),
            name: "Bad deploy",
            requirement: Requirement::all([
                Requirement::Predicate(SignalPredicate::Contains {
                    key: "waiting_reasons".to_owned(),
                    member: "CrashLoopBackOff".to_owned(),
                }),
                Requirement::Predicate(SignalPredicate::IsTrue("has_recent_deploy".to_owned())),
            ]),
            category: Category::BadDeploy,
            base_confidence: 0.90,
            recommended_actions: vec![ActionTemplate {
                action_type: ActionType::RollbackDeployment,
                risk_level: RiskLevel::Medium,
                default_parameters: BTreeMap::new(),
            }],
        },
        RuleDefinition {
            id: RuleId::new("external-dependency"),
            name: "External dep",
            requirement: Requirement::all([
                Requirement::Predicate(SignalPredicate::Contains {
                    key: "waiting_reasons".to_owned(),
                    member: "CrashLoopBackOff".to_owned(),
                }),
                Requirement::Predicate(SignalPredicate::IsTrue("has_recent_deploy".to_owned())).negate(),
                Requirement::Predicate(SignalPredicate::Compare {
                    key: "error_log_rate".to_owned(),
                    comparator: NumericComparator::GreaterThan,
                    threshold: thresholds.error_log_rate,
                }),
            ]),
            category: Category::ExternalDependency,
            base_confidence: 0.75,
            recommended_actions: vec![ActionTemplate {
                action_type: ActionType::RestartDeployment,
                risk_level: RiskLevel::Low,
                default_parameters: BTreeMap::new(),
            }],
        },
        RuleDefinition {
            id: RuleId::new("oom"),
            name: "OOM",
            requirement: Requirement::any([
                Requirement::Predicate(SignalPredicate::Contains {
                    key: "terminated_reasons".to_owned(),
                    member: "OOMKilled".to_owned(),
                }),
                Requirement::Predicate(SignalPredicate::Compare {
                    key: "memory_usage_ratio".to_owned(),
                    comparator: NumericComparator::GreaterThanOrEqual,
                    threshold: 0.95,
                }),
            ]),
            category: Category::MemoryExhaustion,
            base_confidence: 0.95,
            recommended_actions: vec![ActionTemplate {
                action_type: ActionType::UpdateResourceLimits,
                risk_level: RiskLevel::Medium,
                default_parameters: BTreeMap::new(),
            }],
        },
        RuleDefinition {
            id: RuleId::new("image-issue"),
            name: "Image issue",
            requirement: Requirement::Predicate(SignalPredicate::IntersectsAny {
                key: "waiting_reasons".to_owned(),
                members: vec!["ImagePullBackOff".to_owned(), "ErrImagePull".to_owned()],
            }),
            category: Category::ImageIssue,
            base_confidence: 0.95,
            recommended_actions: vec![ActionTemplate {
                action_type: ActionType::RollbackDeployment,
                risk_level: RiskLevel::Medium,
                default_parameters: BTreeMap::new(),
            }],
        },
        RuleDefinition {
            id: RuleId::new("scale-limit"),
            name: "Scale limit",
            requirement: Requirement::all([
                Requirement::Predicate(SignalPredicate::IsTrue("hpa_at_max".to_owned())),
                Requirement::Predicate(SignalPredicate::Compare {
                    key: "latency_p99".to_owned(),
                    comparator: NumericComparator::GreaterThan,
                    threshold: thresholds.latency_p99,
                }),
            ]),
            category: Category::ScalingLimit,
            base_confidence: 0.80,
            recommended_actions: vec![ActionTemplate {
                action_type: ActionType::ScaleReplicas,
                risk_level: RiskLevel::Medium,
                default_parameters: BTreeMap::new(),
            }],
        },
        RuleDefinition {
            id: RuleId::new("infra"),
            name: "Infra",
            requirement: Requirement::all([
                Requirement::Predicate(SignalPredicate::IsTrue("node_unhealthy".to_owned())),
                Requirement::Predicate(SignalPredicate::Compare {
                    key: "pod_failures_on_node".to_owned(),
                    comparator: NumericComparator::GreaterThan,
                    threshold: 1.0,
                }),
            ]),
            category: Category::Infrastructure,
            base_confidence: 0.85,
            recommended_actions: vec![ActionTemplate {
                action_type: ActionType::CordonNode,
                risk_level: RiskLevel::High,
                default_parameters: BTreeMap::new(),
            }],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::built_in_rules;
    use super::RuleThresholds;
    use crate::core::hypothesis::Category;

    #[test]
    fn built_in_rule_table_covers_every_spec_category() {
        let rules = built_in_rules(RuleThresholds::default());
        let categories: Vec<Category> = rules.iter().map(|rule| rule.category).collect();
        assert!(categories.contains(&Category::BadDeploy));
        assert!(categories.contains(&Category::ExternalDependency));
        assert!(categories.contains(&Category::MemoryExhaustion));
        assert!(categories.contains(&Category::ImageIssue));
        assert!(categories.contains(&Category::ScalingLimit));
        assert!(categories.contains(&Category::Infrastructure));
    }

    #[test]
    fn rule_ids_are_unique() {
        let rules = built_in_rules(RuleThresholds::default());
        let mut ids: Vec<String> = rules.iter().map(|rule| rule.id.to_string()).collect();
        let before = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), before);
    }
}
