// aiops-cli/src/investigate.rs
// ============================================================================
// Module: Investigate Pipeline Driver
// Description: The host that drives one incident through C1-C7 against the
//              HTTP backend clients and the SQLite store.
// Purpose: Collect evidence, rank hypotheses, gate and (if allowed) execute
//          a remediation action, verify its effect, and journal every step
//          so `aiops audit` can replay the run.
// Dependencies: aiops-core, aiops-config, aiops-collectors, aiops-dispatch,
//               aiops-store-sqlite, crate::backends, time
// ============================================================================

//! ## Overview
//! `run` is the single entry point the `investigate` CLI command calls. It
//! is deliberately a thin, synchronous, single-threaded orchestration: every
//! state transition it produces is journaled as a [`WorkflowEvent`] before
//! the next stage begins, mirroring the workflow core's own "journal before
//! observed" discipline even though this driver itself is not replayable.
//! The actual decision logic — rule evaluation, policy gating, verification
//! success — lives in `aiops-core`/`aiops-collectors`/`aiops-dispatch`; this
//! module only sequences those calls and persists their results.

// ============================================================================
// SECTION: Imports
// ============================================================================

use aiops_collectors::ClusterStateCollector;
use aiops_collectors::CollectorAccessPolicy;
use aiops_collectors::CollectorRegistry;
use aiops_collectors::DeployDiffCollector;
use aiops_collectors::LogsCollector;
use aiops_collectors::MetricsCollector;
use aiops_collectors::MetricsVerifier;
use aiops_collectors::PreActionSnapshot;
use aiops_config::PipelineConfig;
use aiops_core::blast_radius_score;
use aiops_core::built_in_rules;
use aiops_core::derive_idempotency_key;
use aiops_core::evaluate_policy;
use aiops_core::evaluate_rules;
use aiops_core::extract_signals;
use aiops_core::ActionId;
use aiops_core::ActionStatus;
use aiops_core::ApprovalChannel;
use aiops_core::ApprovalOutcome;
use aiops_core::AttributeValue;
use aiops_core::BlastRadiusInputs;
use aiops_core::CategoryWeights;
use aiops_core::CollectionContext;
use aiops_core::CollectorError;
use aiops_core::CollectorRegistryError;
use aiops_core::EntityAttributes;
use aiops_core::EntityKey;
use aiops_core::EntityKind;
use aiops_core::Evidence;
use aiops_core::EvidenceData;
use aiops_core::GraphStore;
use aiops_core::GraphStoreError;
use aiops_core::IncidentId;
use aiops_core::IncidentStatus;
use aiops_core::MetricName;
use aiops_core::PolicyDecision;
use aiops_core::PolicyInputs;
use aiops_core::RelationKind;
use aiops_core::RemediationAction;
use aiops_core::RuleThresholds;
use aiops_core::TerminalReason;
use aiops_core::TimeWindow;
use aiops_core::Timestamp;
use aiops_core::Verifier;
use aiops_core::VerifierError;
use aiops_core::WorkflowEvent;
use aiops_core::WorkflowStore;
use aiops_core::WorkflowStoreError;
use aiops_dispatch::BackendRegistry;
use aiops_dispatch::DispatchError;
use aiops_dispatch::ExecutionDeadlines;
use aiops_dispatch::RemediationExecutor;
use aiops_store_sqlite::SqliteStore;
use aiops_store_sqlite::SqliteStoreError;
use thiserror::Error;
use time::OffsetDateTime;
use time::Weekday;

use crate::backends::build_http_client;
use crate::backends::HttpClusterApiClient;
use crate::backends::HttpDeployHistoryClient;
use crate::backends::HttpLogBackendClient;
use crate::backends::HttpMetricsBackendClient;
use crate::backends::K8sActionBackend;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Everything that can stop an investigation run before it reaches a
/// terminal incident status.
#[derive(Debug, Error)]
pub enum InvestigateError {
    /// No incident with the given id exists.
    #[error("incident {0} not found")]
    IncidentNotFound(String),
    /// The workflow store (journal, incident, or action records) failed.
    #[error(transparent)]
    WorkflowStore(#[from] WorkflowStoreError),
    /// An operator-facing read against the store failed.
    #[error(transparent)]
    Store(#[from] SqliteStoreError),
    /// The evidence graph store failed.
    #[error(transparent)]
    GraphStore(#[from] GraphStoreError),
    /// Registering a collector failed (duplicate collector id).
    #[error(transparent)]
    Registry(#[from] CollectorRegistryError),
    /// A backend call made outside the collector registry (e.g. the
    /// pre-action metrics sample) failed.
    #[error(transparent)]
    Collector(#[from] CollectorError),
    /// Dispatching the remediation action failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// Post-execution verification failed.
    #[error(transparent)]
    Verifier(#[from] VerifierError),
    /// The approval channel transport failed.
    #[error(transparent)]
    Approval(#[from] aiops_core::ApprovalError),
    /// Journaling an event failed to serialize.
    #[error("failed to serialize workflow event: {0}")]
    Serialize(serde_json::Error),
    /// Building the shared HTTP client failed.
    #[error("failed to build http client: {0}")]
    HttpClient(reqwest::Error),
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Drives `incident_id` through evidence collection, hypothesis ranking,
/// policy gating, execution, and verification, journaling each step.
///
/// # Errors
///
/// Returns [`InvestigateError`] if the incident does not exist or any stage
/// fails in a way that leaves the run unable to continue. A policy denial or
/// a failed execution/verification is not an error: it is journaled as a
/// terminal [`WorkflowEvent`] and `Ok(())` is returned.
pub fn run(store: &SqliteStore, config: &PipelineConfig, incident_id: &IncidentId) -> Result<(), InvestigateError> {
    let mut incident = store
        .load_incident(incident_id)?
        .ok_or_else(|| InvestigateError::IncidentNotFound(incident_id.as_str().to_owned()))?;

    let (now_millis, current_hour, is_weekend) = wall_clock_context();
    let now = Timestamp::UnixMillis(now_millis);
    let client = build_http_client().map_err(InvestigateError::HttpClient)?;

    let lookback_ms = i64::try_from(config.deadlines.collection_deadline_total_ms).unwrap_or(i64::MAX);
    let time_window =
        TimeWindow { start: Timestamp::UnixMillis(now_millis.saturating_sub(lookback_ms)), end: now };
    let ctx = CollectionContext {
        incident_id: incident_id.clone(),
        cluster: incident.cluster.clone(),
        namespace: incident.namespace.clone(),
        service: incident.service.clone(),
        time_window,
    };

    let report = collect_evidence(&ctx, config, &client)?;
    for (collector_id, error) in &report.failures {
        tracing::warn!(collector = %collector_id, %error, "collector failed during investigation");
    }

    for evidence in &report.evidence {
        join_evidence_into_graph(store, incident_id, incident.cluster.as_str(), evidence)?;
    }
    append_event(
        store,
        incident_id,
        WorkflowEvent::CollectionJoined { at: now, partial: !report.failures.is_empty() },
    )?;

    let (signals, provenance) = extract_signals(&report.evidence);
    let rules = built_in_rules(RuleThresholds::default());
    let hypotheses = evaluate_rules(incident_id, &signals, &provenance, &rules, &CategoryWeights::neutral());
    append_event(store, incident_id, WorkflowEvent::HypothesesRanked { at: now, hypotheses: hypotheses.clone() })?;

    let Some(top_hypothesis) = hypotheses.first() else {
        return terminate(store, incident_id, &mut incident, now, TerminalReason::PolicyDenied);
    };
    let Some(action_template) = top_hypothesis.recommended_actions.first() else {
        return terminate(store, incident_id, &mut incident, now, TerminalReason::PolicyDenied);
    };

    let idempotency_key = derive_idempotency_key(
        incident_id,
        action_template.action_type,
        &incident.namespace,
        incident.service.as_deref().unwrap_or(&incident.namespace),
        &action_template.default_parameters,
    );
    if let Some(cached) = store.load_action_by_idempotency_key(idempotency_key.as_str())? {
        tracing::info!(action_id = %cached.id, "remediation action already recorded for this idempotency key");
        return Ok(());
    }

    let blast_radius_weights = config.policy.blast_radius_weights.to_weights();
    let blast_radius = blast_radius_score(
        BlastRadiusInputs {
            // A single target resource is affected per action in this model.
            replica_fraction_affected: 1.0,
            namespace_criticality: 0.5,
            environment: config.environment,
            action_risk: action_template.risk_level,
        },
        blast_radius_weights,
    );

    let mut action = RemediationAction {
        id: ActionId::new(format!("action:{}", idempotency_key.as_str())),
        incident_id: incident_id.clone(),
        hypothesis_id: Some(top_hypothesis.id.clone()),
        idempotency_key,
        action_type: action_template.action_type,
        target_resource: incident.service.clone().unwrap_or_else(|| incident.namespace.clone()),
        target_namespace: incident.namespace.clone(),
        parameters: action_template.default_parameters.clone(),
        risk_level: action_template.risk_level,
        blast_radius_score: blast_radius,
        status: ActionStatus::Proposed,
        requires_approval: false,
        approved_by: None,
        approved_at: None,
        executed_at: None,
        completed_at: None,
        execution_result: None,
    };
    store.save_action(&action)?;

    let policy_inputs = PolicyInputs {
        environment: config.environment,
        action_type: action.action_type,
        namespace: action.target_namespace.clone(),
        blast_radius_score: blast_radius,
        affected_replicas: 1,
        current_hour,
        is_weekend,
        freeze_active: false,
        allowlist: config.policy.allowlist_for(config.environment),
    };
    let decision = evaluate_policy(&policy_inputs);
    append_event(
        store,
        incident_id,
        WorkflowEvent::PolicyDecided { at: now, action_id: action.id.clone(), decision: decision.clone() },
    )?;

    match decision {
        PolicyDecision::Deny { .. } => {
            action.status = ActionStatus::PolicyDenied;
            action.completed_at = Some(now);
            store.save_action(&action)?;
            return terminate(store, incident_id, &mut incident, now, TerminalReason::PolicyDenied);
        }
        PolicyDecision::RequireApproval { .. } => {
            if !run_approval_wait(store, incident_id, &mut action, config, now)? {
                return terminate(store, incident_id, &mut incident, now, TerminalReason::ApprovalTimeout);
            }
        }
        PolicyDecision::Allow => {}
    }

    incident.status = IncidentStatus::Executing;
    store.save_incident(&incident)?;
    action.status = ActionStatus::Executing;
    action.executed_at = Some(now);
    store.save_action(&action)?;

    let pre_action_metrics = HttpMetricsBackendClient::new(client.clone(), config.backends.metrics_backend_endpoint.clone());
    let pre_action_snapshot = PreActionSnapshot {
        error_rate: pre_action_metrics
            .sample_via(&action.target_namespace, Some(action.target_resource.as_str()), MetricName::Http5xxRate, time_window)?,
        latency: pre_action_metrics
            .sample_via(&action.target_namespace, Some(action.target_resource.as_str()), MetricName::P99Latency, time_window)?,
    };

    let verifier = MetricsVerifier::new(
        HttpMetricsBackendClient::new(client.clone(), config.backends.metrics_backend_endpoint.clone()),
        HttpClusterApiClient::new(client.clone(), config.backends.cluster_api_endpoint.clone()),
        time_window,
    );
    verifier.record_pre_action(action.id.clone(), pre_action_snapshot);

    let mut backends = BackendRegistry::new();
    backends.register(K8sActionBackend::new(client.clone(), config.backends.cluster_api_endpoint.clone()));
    let executor = RemediationExecutor::new(
        backends,
        store,
        ExecutionDeadlines {
            per_attempt_ms: config.deadlines.execution_deadline_per_attempt_ms,
            overall_ms: config.deadlines.execution_deadline_overall_ms,
        },
    );
    let executed = executor.execute(action)?;
    let completed_at = executed.completed_at.unwrap_or(now);
    let result = executed
        .execution_result
        .clone()
        .unwrap_or(aiops_core::ExecutionResult::Other { detail: "no execution result recorded".to_owned() });
    append_event(store, incident_id, WorkflowEvent::ExecutionCompleted { at: completed_at, attempt: 1, result })?;

    if executed.status != ActionStatus::Succeeded {
        return terminate(store, incident_id, &mut incident, completed_at, TerminalReason::ExecutionFailed);
    }

    let verification = verifier.verify(&executed)?;
    store.save_verification(&verification.id, &verification)?;
    append_event(store, incident_id, WorkflowEvent::VerificationCompleted { at: completed_at, result: verification })?;

    incident.status = if verification.success { IncidentStatus::Resolved } else { IncidentStatus::Failed };
    incident.resolved_at = Some(completed_at);
    store.save_incident(&incident)?;
    Ok(())
}

// ============================================================================
// SECTION: Stages
// ============================================================================

/// Builds the four HTTP-backed collectors and runs one collection pass.
fn collect_evidence(
    ctx: &CollectionContext,
    config: &PipelineConfig,
    client: &reqwest::blocking::Client,
) -> Result<aiops_collectors::CollectionReport, InvestigateError> {
    let mut registry = CollectorRegistry::new(CollectorAccessPolicy::allow_all());
    registry.register_collector(
        "cluster-state",
        ClusterStateCollector::new(HttpClusterApiClient::new(client.clone(), config.backends.cluster_api_endpoint.clone())),
    )?;
    registry.register_collector(
        "logs",
        LogsCollector::new(HttpLogBackendClient::new(client.clone(), config.backends.log_backend_endpoint.clone())),
    )?;
    registry.register_collector(
        "metrics",
        MetricsCollector::new(HttpMetricsBackendClient::new(client.clone(), config.backends.metrics_backend_endpoint.clone())),
    )?;
    registry.register_collector(
        "deploy-diff",
        DeployDiffCollector::new(
            HttpDeployHistoryClient::new(client.clone(), config.backends.cluster_api_endpoint.clone()),
            config.deadlines.deploy_lookback_ms,
        ),
    )?;
    Ok(registry.collect_all(ctx))
}

/// Upserts `evidence`'s subject entity, links it to the incident, and
/// attaches the evidence record itself to the graph.
fn join_evidence_into_graph(
    store: &SqliteStore,
    incident_id: &IncidentId,
    cluster: &str,
    evidence: &Evidence,
) -> Result<(), InvestigateError> {
    let key = EntityKey {
        cluster: cluster.to_owned(),
        namespace: evidence.entity_namespace.clone(),
        kind: entity_kind_for(evidence),
        name: evidence.entity_name.clone(),
    };
    let mut attributes = EntityAttributes::new();
    attributes.insert("last_evidence_source".to_owned(), AttributeValue::Scalar(format!("{:?}", evidence.source)));
    let node_id = store.upsert_entity(key, attributes)?;
    store.link_incident_to_entity(incident_id, &node_id, RelationKind::Affects)?;
    store.attach_evidence(incident_id, evidence)?;
    Ok(())
}

/// Classifies which graph entity kind an evidence record's subject is.
fn entity_kind_for(evidence: &Evidence) -> EntityKind {
    match evidence.data {
        EvidenceData::PodState(_) | EvidenceData::ContainerState(_) => EntityKind::Pod,
        EvidenceData::NodeState(_) => EntityKind::Node,
        EvidenceData::HpaState(_) => EntityKind::Hpa,
        EvidenceData::DeployHistory(_) => EntityKind::Deployment,
        EvidenceData::LogsPattern(_) | EvidenceData::MetricSample(_) | EvidenceData::Events(_) => EntityKind::Pod,
    }
}

/// Journals the approval request, blocks on the channel, and folds the
/// outcome back into `action`'s record, returning whether it was approved.
fn run_approval_wait(
    store: &SqliteStore,
    incident_id: &IncidentId,
    action: &mut RemediationAction,
    config: &PipelineConfig,
    at: Timestamp,
) -> Result<bool, InvestigateError> {
    action.requires_approval = true;
    action.status = ActionStatus::AwaitingApproval;
    store.save_action(action)?;

    let deadline_ms = i64::try_from(config.deadlines.approval_timeout_ms).unwrap_or(i64::MAX);
    let deadline = match at {
        Timestamp::UnixMillis(millis) => Timestamp::UnixMillis(millis.saturating_add(deadline_ms)),
        Timestamp::Logical(_) => at,
    };
    append_event(store, incident_id, WorkflowEvent::ApprovalRequested { at, deadline })?;

    let summary = format!("{:?} {} in {}", action.action_type, action.target_resource, action.target_namespace);
    let outcome = store.request(&action.id, &summary, deadline)?;
    let approved = matches!(outcome, ApprovalOutcome::Approved);
    append_event(store, incident_id, WorkflowEvent::ApprovalResolved { at, approved })?;

    if approved {
        if let Some(approved_record) = store.load_action(&action.id)? {
            action.approved_by = approved_record.approved_by;
            action.approved_at = approved_record.approved_at;
        }
        action.status = ActionStatus::Approved;
    } else {
        action.status = ActionStatus::Failed;
        action.completed_at = Some(at);
    }
    store.save_action(action)?;
    Ok(approved)
}

/// Journals a terminal-without-resolution event and marks the incident
/// `failed`.
fn terminate(
    store: &SqliteStore,
    incident_id: &IncidentId,
    incident: &mut aiops_core::Incident,
    at: Timestamp,
    reason: TerminalReason,
) -> Result<(), InvestigateError> {
    append_event(store, incident_id, WorkflowEvent::TerminatedWithoutResolution { at, reason })?;
    incident.status = IncidentStatus::Failed;
    incident.resolved_at = Some(at);
    store.save_incident(incident)?;
    Ok(())
}

/// Serializes `event` and appends it to the incident's journal.
fn append_event(store: &SqliteStore, incident_id: &IncidentId, event: WorkflowEvent) -> Result<(), InvestigateError> {
    let event_json = serde_json::to_string(&event).map_err(InvestigateError::Serialize)?;
    store.append_event(incident_id, &event_json)?;
    Ok(())
}

/// Reads the wall clock once for this run: current Unix millis, hour, and
/// whether today is a weekend, for the policy gate's time-of-day inputs.
/// The workflow core never does this itself (§4.7); only this host may.
fn wall_clock_context() -> (i64, u8, bool) {
    let now = OffsetDateTime::now_utc();
    #[allow(clippy::cast_possible_truncation, reason = "unix millis fit in i64 until the year 292277026596")]
    let millis = (now.unix_timestamp_nanos() / 1_000_000) as i64;
    let is_weekend = matches!(now.weekday(), Weekday::Saturday | Weekday::Sunday);
    (millis, now.hour(), is_weekend)
}

/// A thin extension so the pre-action metrics sample can go through the
/// same `MetricsBackendClient` the verifier and collector use.
trait SampleValue {
    /// Samples `metric` and returns its bare value, for use outside the
    /// evidence-collection path.
    fn sample_via(
        &self,
        namespace: &str,
        service: Option<&str>,
        metric: MetricName,
        window: TimeWindow,
    ) -> Result<f64, CollectorError>;
}

impl<T: aiops_collectors::MetricsBackendClient> SampleValue for T {
    fn sample_via(
        &self,
        namespace: &str,
        service: Option<&str>,
        metric: MetricName,
        window: TimeWindow,
    ) -> Result<f64, CollectorError> {
        self.sample(namespace, service, metric, window).map(|data| data.value)
    }
}
