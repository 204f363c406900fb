// aiops-core/src/core/evidence.rs
// ============================================================================
// Module: Evidence Model
// Description: Evidence records collected by C2 and stored by C1.
// Purpose: Typed evidence payloads keyed by evidence type, and a flat signal
//          map (§4.3) reduced from a full evidence set.
// Dependencies: serde, serde_json, bigdecimal, time, crate::core::{identifiers, time}
// ============================================================================

//! ## Overview
//! Evidence is heterogeneous across collectors: a `pod_state` record and a
//! `metric_sample` record carry unrelated shapes. Rather than an untyped bag,
//! `EvidenceData` is a tagged variant keyed by [`EvidenceType`], each with its
//! own structured fields.
//!
//! Signal extraction (§4.3) reduces a full `Evidence` set into a flat
//! [`SignalMap`]: individual signal values the rule predicates read. A signal
//! absent from the map is `Unknown`, not false or zero — see
//! [`SignalValue`] and [`SignalMap::evaluate`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde::Serialize;
use tri_logic::TriState;

use crate::core::identifiers::EvidenceId;
use crate::core::identifiers::IncidentId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Evidence Type & Source
// ============================================================================

/// The kind of evidence a collector produced.
///
/// # Invariants
/// - Determines which [`EvidenceData`] variant is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    /// Pod phase and container waiting/terminated reasons.
    PodState,
    /// Container-level waiting/terminated state, independent of pod phase.
    ContainerState,
    /// Deployment/ReplicaSet rollout history.
    DeployHistory,
    /// Log line pattern match counts and sample traces.
    LogsPattern,
    /// A single metrics-backend query result.
    MetricSample,
    /// Node condition state (`Ready`, `DiskPressure`, …).
    NodeState,
    /// HPA current vs max replica state.
    HpaState,
    /// Cluster event (`FailedScheduling`, `BackOff`, …).
    Events,
}

/// The collector family that produced a piece of evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    /// Kubernetes cluster API.
    K8s,
    /// Log backend.
    Logs,
    /// Metrics backend.
    Metrics,
    /// Deploy/rollout history.
    Deploy,
}

// ============================================================================
// SECTION: Evidence Data Payloads
// ============================================================================

/// A container waiting or terminated reason observed on a pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ContainerReason {
    /// `CrashLoopBackOff`
    CrashLoopBackOff,
    /// `OOMKilled`
    OomKilled,
    /// `ImagePullBackOff`
    ImagePullBackOff,
    /// `ErrImagePull`
    ErrImagePull,
    /// `CreateContainerConfigError`
    CreateContainerConfigError,
}

/// Typed payload for [`EvidenceType::PodState`] / [`EvidenceType::ContainerState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodStateData {
    /// Waiting reasons observed across the pod's containers.
    pub waiting_reasons: BTreeSet<ContainerReason>,
    /// Terminated reasons observed across the pod's containers.
    pub terminated_reasons: BTreeSet<ContainerReason>,
    /// Container restart count.
    pub restart_count: u32,
    /// Whether the pod is currently ready.
    pub ready: bool,
}

/// Typed payload for [`EvidenceType::DeployHistory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployHistoryData {
    /// Whether a revision was created within `deploy_lookback`.
    pub has_recent_deploy: bool,
    /// Minutes since the most recent revision was created.
    pub minutes_since_revision: f64,
    /// Whether the image tag changed between current and prior ReplicaSet.
    pub image_tag_changed: bool,
    /// Whether the config hash changed between current and prior ReplicaSet.
    pub config_hash_changed: bool,
}

/// Typed payload for [`EvidenceType::LogsPattern`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogsPatternData {
    /// Matches per minute for each regex class.
    pub matches_per_minute: BTreeMap<String, f64>,
    /// Up to `N` sample stack traces (default 5).
    pub samples: Vec<String>,
}

/// Typed payload for [`EvidenceType::MetricSample`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSampleData {
    /// The metric name (e.g. `memory_usage_ratio`).
    pub metric: MetricName,
    /// The sampled value.
    pub value: f64,
}

/// The fixed PromQL-family metric set evaluated by the metrics collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    /// `restart_count_delta(window)`
    RestartCountDelta,
    /// `memory_usage_ratio`
    MemoryUsageRatio,
    /// `cpu_throttle_rate`
    CpuThrottleRate,
    /// `http_5xx_rate`
    Http5xxRate,
    /// `p99_latency`
    P99Latency,
    /// `hpa_utilization`
    HpaUtilization,
}

/// Typed payload for [`EvidenceType::NodeState`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeStateData {
    /// Node `Ready` condition.
    pub ready: bool,
    /// Node `DiskPressure` condition.
    pub disk_pressure: bool,
    /// Node `MemoryPressure` condition.
    pub memory_pressure: bool,
    /// Node `PIDPressure` condition.
    pub pid_pressure: bool,
    /// Number of pod failures observed scheduled on this node.
    pub pod_failures_on_node: u32,
}

/// Typed payload for [`EvidenceType::HpaState`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HpaStateData {
    /// Current replica count.
    pub current_replicas: u32,
    /// Maximum configured replica count.
    pub max_replicas: u32,
}

impl HpaStateData {
    /// Whether the HPA is pinned at its configured maximum.
    #[must_use]
    pub const fn at_max(self) -> bool {
        self.current_replicas >= self.max_replicas
    }
}

/// Typed payload for [`EvidenceType::Events`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ClusterEventReason {
    /// `FailedScheduling`
    FailedScheduling,
    /// `BackOff`
    BackOff,
    /// `Unhealthy`
    Unhealthy,
    /// `FailedMount`
    FailedMount,
}

/// The tagged, per-type evidence payload.
///
/// # Invariants
/// - The active variant always matches the sibling `evidence_type` field on
///   [`Evidence`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "evidence_type", rename_all = "snake_case")]
pub enum EvidenceData {
    /// See [`EvidenceType::PodState`].
    PodState(PodStateData),
    /// See [`EvidenceType::ContainerState`].
    ContainerState(PodStateData),
    /// See [`EvidenceType::DeployHistory`].
    DeployHistory(DeployHistoryData),
    /// See [`EvidenceType::LogsPattern`].
    LogsPattern(LogsPatternData),
    /// See [`EvidenceType::MetricSample`].
    MetricSample(MetricSampleData),
    /// See [`EvidenceType::NodeState`].
    NodeState(NodeStateData),
    /// See [`EvidenceType::HpaState`].
    HpaState(HpaStateData),
    /// See [`EvidenceType::Events`].
    Events(BTreeSet<ClusterEventReason>),
}

impl EvidenceData {
    /// Returns the [`EvidenceType`] this payload belongs to.
    #[must_use]
    pub const fn evidence_type(&self) -> EvidenceType {
        match self {
            Self::PodState(_) => EvidenceType::PodState,
            Self::ContainerState(_) => EvidenceType::ContainerState,
            Self::DeployHistory(_) => EvidenceType::DeployHistory,
            Self::LogsPattern(_) => EvidenceType::LogsPattern,
            Self::MetricSample(_) => EvidenceType::MetricSample,
            Self::NodeState(_) => EvidenceType::NodeState,
            Self::HpaState(_) => EvidenceType::HpaState,
            Self::Events(_) => EvidenceType::Events,
        }
    }
}

// ============================================================================
// SECTION: Evidence Record
// ============================================================================

/// A bounded time window over which evidence was collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Window start.
    pub start: Timestamp,
    /// Window end.
    pub end: Timestamp,
}

/// A single piece of evidence collected for an incident.
///
/// # Invariants
/// - Belongs to exactly one incident (`incident_id`).
/// - `signal_strength` is assigned once by the collector and never mutated
///   downstream.
/// - `signal_strength` lies in `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Evidence identifier.
    pub id: EvidenceId,
    /// Owning incident.
    pub incident_id: IncidentId,
    /// Collector family that produced this evidence.
    pub source: EvidenceSource,
    /// The entity this evidence is about (pod name, node name, …).
    pub entity_name: String,
    /// The namespace of the entity this evidence is about.
    pub entity_namespace: String,
    /// Typed, per-type payload.
    pub data: EvidenceData,
    /// Signal strength in `[0, 1]`, assigned per the rubric in §4.2.
    pub signal_strength: f64,
    /// When this evidence was collected.
    pub collected_at: Timestamp,
    /// The window the evidence was collected over.
    pub time_window: TimeWindow,
    /// Set when the collector hit its deadline before finishing.
    pub partial: bool,
}

impl Evidence {
    /// Returns the [`EvidenceType`] of this record's payload.
    #[must_use]
    pub const fn evidence_type(&self) -> EvidenceType {
        self.data.evidence_type()
    }
}

// ============================================================================
// SECTION: Signal Map
// ============================================================================

/// A flat signal value extracted from an evidence set.
///
/// # Invariants
/// - A signal absent from a [`SignalMap`] is treated as unknown, never as
///   false or zero; see [`SignalMap::evaluate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    /// A boolean signal (e.g. `has_recent_deploy`).
    Bool(bool),
    /// A numeric signal (e.g. `memory_usage_ratio`, `latency_p99`).
    Number(f64),
    /// A set-valued signal (e.g. `waiting_reasons`).
    StringSet(BTreeSet<String>),
}

/// A named signal key into a [`SignalMap`].
pub type SignalKey = String;

/// The comparator applied when evaluating a numeric signal predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericComparator {
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
}

/// The flat signal map reduced from an incident's evidence set (§4.3).
///
/// # Invariants
/// - A key absent from `values` is unknown, not false or zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalMap {
    /// Extracted signal values, keyed by signal name.
    pub values: BTreeMap<SignalKey, SignalValue>,
}

impl SignalMap {
    /// Creates an empty signal map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites a signal value.
    pub fn set(&mut self, key: impl Into<SignalKey>, value: SignalValue) {
        self.values.insert(key.into(), value);
    }

    /// Returns whether `reason` is present in a string-set signal, or
    /// `Unknown` if the key is absent or not a string set.
    #[must_use]
    pub fn contains(&self, key: &str, member: &str) -> TriState {
        match self.values.get(key) {
            Some(SignalValue::StringSet(set)) => TriState::from(set.contains(member)),
            _ => TriState::Unknown,
        }
    }

    /// Returns the boolean value of `key`, or `Unknown` if absent or not a
    /// boolean.
    #[must_use]
    pub fn is_true(&self, key: &str) -> TriState {
        match self.values.get(key) {
            Some(SignalValue::Bool(value)) => TriState::from(*value),
            _ => TriState::Unknown,
        }
    }

    /// Compares the numeric value of `key` against `threshold` using
    /// `comparator`, decimal-aware (see [`compare_numeric`]). Returns
    /// `Unknown` if `key` is absent or not numeric.
    #[must_use]
    pub fn compare(&self, key: &str, comparator: NumericComparator, threshold: f64) -> TriState {
        match self.values.get(key) {
            Some(SignalValue::Number(value)) => compare_numeric(comparator, *value, threshold),
            _ => TriState::Unknown,
        }
    }

    /// Returns the number of string-set members in `key`'s union with
    /// `members`, used by `Infra`'s "intersection non-empty" predicate style.
    /// Returns `Unknown` if `key` is absent or not a string set.
    #[must_use]
    pub fn intersects_any(&self, key: &str, members: &[&str]) -> TriState {
        match self.values.get(key) {
            Some(SignalValue::StringSet(set)) => {
                TriState::from(members.iter().any(|member| set.contains(*member)))
            }
            _ => TriState::Unknown,
        }
    }
}

/// Compares two `f64` values decimal-aware via `BigDecimal`, so that
/// threshold comparisons round-trip identically however the value arrived
/// (collector float math, JSON re-serialization, config parsing).
///
/// Returns `Unknown` if either value is not finite or fails to parse.
#[must_use]
pub fn compare_numeric(comparator: NumericComparator, value: f64, threshold: f64) -> TriState {
    let Some(ordering) = decimal_cmp(value, threshold) else {
        return TriState::Unknown;
    };
    let result = match comparator {
        NumericComparator::GreaterThan => ordering.is_gt(),
        NumericComparator::GreaterThanOrEqual => ordering.is_ge(),
        NumericComparator::LessThan => ordering.is_lt(),
        NumericComparator::LessThanOrEqual => ordering.is_le(),
    };
    TriState::from(result)
}

/// Orders two `f64` values using decimal-aware comparison.
fn decimal_cmp(left: f64, right: f64) -> Option<Ordering> {
    let left = decimal_from_f64(left)?;
    let right = decimal_from_f64(right)?;
    Some(left.cmp(&right))
}

/// Parses an `f64` into `BigDecimal` via its shortest round-tripping string
/// representation, rejecting non-finite values.
fn decimal_from_f64(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    BigDecimal::from_str(&value.to_string()).ok()
}

#[cfg(test)]
mod tests {
    use super::NumericComparator;
    use super::SignalMap;
    use super::SignalValue;
    use std::collections::BTreeSet;
    use tri_logic::TriState;

    #[test]
    fn unknown_signal_is_unknown_not_false() {
        let signals = SignalMap::new();
        assert_eq!(signals.is_true("has_recent_deploy"), TriState::Unknown);
        assert_eq!(signals.contains("waiting_reasons", "OOMKilled"), TriState::Unknown);
        assert_eq!(
            signals.compare("memory_usage_ratio", NumericComparator::GreaterThanOrEqual, 0.95),
            TriState::Unknown
        );
    }

    #[test]
    fn known_signal_evaluates_definitely() {
        let mut signals = SignalMap::new();
        signals.set("has_recent_deploy", SignalValue::Bool(true));
        signals.set("memory_usage_ratio", SignalValue::Number(0.98));
        signals.set(
            "waiting_reasons",
            SignalValue::StringSet(BTreeSet::from(["CrashLoopBackOff".to_owned()])),
        );

        assert_eq!(signals.is_true("has_recent_deploy"), TriState::True);
        assert_eq!(
            signals.compare("memory_usage_ratio", NumericComparator::GreaterThanOrEqual, 0.95),
            TriState::True
        );
        assert_eq!(signals.contains("waiting_reasons", "CrashLoopBackOff"), TriState::True);
        assert_eq!(signals.contains("waiting_reasons", "OOMKilled"), TriState::False);
    }

    #[test]
    fn decimal_comparison_is_exact_at_boundary() {
        let mut signals = SignalMap::new();
        signals.set("memory_usage_ratio", SignalValue::Number(0.95));
        assert_eq!(
            signals.compare("memory_usage_ratio", NumericComparator::GreaterThanOrEqual, 0.95),
            TriState::True
        );
        assert_eq!(
            signals.compare("memory_usage_ratio", NumericComparator::GreaterThan, 0.95),
            TriState::False
        );
    }
}
