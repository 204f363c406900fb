// aiops-core/src/rules/extraction.rs
// ============================================================================
// Module: Signal Extraction
// Description: Reduces an incident's evidence set into a flat signal map.
// Purpose: Bridge heterogeneous, per-type evidence payloads (§3) to the flat
//          signal vocabulary the rule predicates read (§4.3).
// Dependencies: crate::core::evidence
// ============================================================================

//! ## Overview
//! [`extract_signals`] walks an incident's [`Evidence`] records and folds
//! each typed payload into the named signals §4.3 lists (`waiting_reasons`,
//! `restart_count`, `has_recent_deploy`, `memory_usage_ratio`,
//! `node_unhealthy`, `hpa_at_max`, `error_log_rate`, `image_pull_failed`,
//! `latency_p99`, …). A signal absent from every evidence record is simply
//! never inserted, so [`SignalMap`] lookups correctly fall back to
//! `Unknown` (§4.3).
//!
//! Alongside the signal map, extraction builds a provenance index from
//! signal key to the evidence records that contributed it, so that a fired
//! rule's supporting/contradicting evidence (§4.3's ranking formula) can be
//! traced back to concrete evidence rather than invented.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::core::evidence::Evidence;
use crate::core::evidence::EvidenceData;
use crate::core::evidence::MetricName;
use crate::core::evidence::SignalKey;
use crate::core::evidence::SignalMap;
use crate::core::evidence::SignalValue;
use crate::core::identifiers::EvidenceId;

/// Maps a signal key to the evidence records that contributed a value for
/// it, in the order they were folded in.
pub type SignalProvenance = BTreeMap<SignalKey, Vec<EvidenceId>>;

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Reduces `evidence` into a flat [`SignalMap`] plus the [`SignalProvenance`]
/// index used to trace a fired rule's predicates back to the evidence that
/// decided them.
#[must_use]
pub fn extract_signals(evidence: &[Evidence]) -> (SignalMap, SignalProvenance) {
    let mut signals = SignalMap::new();
    let mut provenance: SignalProvenance = BTreeMap::new();
    let mut waiting_reasons: BTreeSet<String> = BTreeSet::new();
    let mut terminated_reasons: BTreeSet<String> = BTreeSet::new();
    let mut restart_count: u32 = 0;

    for record in evidence {
        match &record.data {
            EvidenceData::PodState(pod) | EvidenceData::ContainerState(pod) => {
                for reason in &pod.waiting_reasons {
                    waiting_reasons.insert(format!("{reason:?}"));
                }
                for reason in &pod.terminated_reasons {
                    terminated_reasons.insert(format!("{reason:?}"));
                }
                restart_count = restart_count.max(pod.restart_count);
                note(&mut provenance, "waiting_reasons", &record.id);
                note(&mut provenance, "terminated_reasons", &record.id);
                note(&mut provenance, "restart_count", &record.id);
            }
            EvidenceData::DeployHistory(deploy) => {
                set(&mut signals, &mut provenance, "has_recent_deploy", SignalValue::Bool(deploy.has_recent_deploy), &record.id);
                set(
                    &mut signals,
                    &mut provenance,
                    "image_tag_changed",
                    SignalValue::Bool(deploy.image_tag_changed),
                    &record.id,
                );
                set(
                    &mut signals,
                    &mut provenance,
                    "config_hash_changed",
                    SignalValue::Bool(deploy.config_hash_changed),
                    &record.id,
                );
            }
            EvidenceData::LogsPattern(logs) => {
                let error_rate = logs.matches_per_minute.get("error").copied().unwrap_or(0.0)
                    + logs.matches_per_minute.get("panic").copied().unwrap_or(0.0);
                set(&mut signals, &mut provenance, "error_log_rate", SignalValue::Number(error_rate), &record.id);
            }
            EvidenceData::MetricSample(metric) => {
                let key = match metric.metric {
                    MetricName::RestartCountDelta => "restart_count_delta",
                    MetricName::MemoryUsageRatio => "memory_usage_ratio",
                    MetricName::CpuThrottleRate => "cpu_throttle_rate",
                    MetricName::Http5xxRate => "http_5xx_rate",
                    MetricName::P99Latency => "latency_p99",
                    MetricName::HpaUtilization => "hpa_utilization",
                };
                set(&mut signals, &mut provenance, key, SignalValue::Number(metric.value), &record.id);
            }
            EvidenceData::NodeState(node) => {
                let unhealthy = !node.ready || node.disk_pressure || node.memory_pressure || node.pid_pressure;
                set(&mut signals, &mut provenance, "node_unhealthy", SignalValue::Bool(unhealthy), &record.id);
                set(
                    &mut signals,
                    &mut provenance,
                    "pod_failures_on_node",
                    SignalValue::Number(f64::from(node.pod_failures_on_node)),
                    &record.id,
                );
            }
            EvidenceData::HpaState(hpa) => {
                set(&mut signals, &mut provenance, "hpa_at_max", SignalValue::Bool(hpa.at_max()), &record.id);
            }
            EvidenceData::Events(reasons) => {
                let failed_scheduling =
                    reasons.iter().any(|reason| format!("{reason:?}") == "FailedScheduling");
                set(
                    &mut signals,
                    &mut provenance,
                    "failed_scheduling",
                    SignalValue::Bool(failed_scheduling),
                    &record.id,
                );
            }
        }
    }

    if !waiting_reasons.is_empty() {
        signals.set("waiting_reasons", SignalValue::StringSet(waiting_reasons));
    }
    if !terminated_reasons.is_empty() {
        signals.set("terminated_reasons", SignalValue::StringSet(terminated_reasons));
    }
    if !evidence.is_empty()
        && evidence.iter().any(|record| matches!(record.data, EvidenceData::PodState(_) | EvidenceData::ContainerState(_)))
    {
        signals.set("restart_count", SignalValue::Number(f64::from(restart_count)));
        let image_pull_failed = signals.contains("waiting_reasons", "ImagePullBackOff").is_true()
            || signals.contains("waiting_reasons", "ErrImagePull").is_true();
        signals.set("image_pull_failed", SignalValue::Bool(image_pull_failed));
    }

    (signals, provenance)
}

fn set(signals: &mut SignalMap, provenance: &mut SignalProvenance, key: &str, value: SignalValue, evidence_id: &EvidenceId) {
    signals.set(key, value);
    note(provenance, key, evidence_id);
}

fn note(provenance: &mut SignalProvenance, key: &str, evidence_id: &EvidenceId) {
    let entries = provenance.entry(key.to_owned()).or_default();
    if !entries.contains(evidence_id) {
        entries.push(evidence_id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::extract_signals;
    use crate::core::evidence::ContainerReason;
    use crate::core::evidence::Evidence;
    use crate::core::evidence::EvidenceData;
    use crate::core::evidence::EvidenceSource;
    use crate::core::evidence::PodStateData;
    use crate::core::evidence::TimeWindow;
    use crate::core::identifiers::EvidenceId;
    use crate::core::identifiers::IncidentId;
    use crate::core::time::Timestamp;
    use std::collections::BTreeSet;
    use tri_logic::TriState;

    fn window() -> TimeWindow {
        TimeWindow { start: Timestamp::UnixMillis(0), end: Timestamp::UnixMillis(60_000) }
    }

    #[test]
    fn pod_state_evidence_populates_waiting_reasons_and_restart_count() {
        let evidence = vec![Evidence {
            id: EvidenceId::new("ev-1"),
            incident_id: IncidentId::new("inc-1"),
            source: EvidenceSource::K8s,
            entity_name: "checkout-7f".to_owned(),
            entity_namespace: "payments".to_owned(),
            data: EvidenceData::PodState(PodStateData {
                waiting_reasons: BTreeSet::from([ContainerReason::CrashLoopBackOff]),
                terminated_reasons: BTreeSet::new(),
                restart_count: 6,
                ready: false,
            }),
            signal_strength: 0.9,
            collected_at: Timestamp::UnixMillis(1_000),
            time_window: window(),
            partial: false,
        }];

        let (signals, provenance) = extract_signals(&evidence);
        assert_eq!(signals.contains("waiting_reasons", "CrashLoopBackOff"), TriState::True);
        assert_eq!(
            signals.compare("restart_count", crate::core::evidence::NumericComparator::GreaterThan, 5.0),
            TriState::True
        );
        assert_eq!(provenance["waiting_reasons"], vec![EvidenceId::new("ev-1")]);
    }

    #[test]
    fn empty_evidence_yields_empty_signal_map() {
        let (signals, provenance) = extract_signals(&[]);
        assert!(signals.values.is_empty());
        assert!(provenance.is_empty());
    }
}
