// aiops-store-sqlite/src/workflow_store.rs
// ============================================================================
// Module: Workflow Store Implementation (C7)
// Description: Persists the incident journal, materialized incident
//              records, executed actions, and verification results.
// Dependencies: rusqlite, serde_json, aiops-core
// ============================================================================

use aiops_core::Incident;
use aiops_core::IncidentId;
use aiops_core::RemediationAction;
use aiops_core::VerificationId;
use aiops_core::VerificationResult;
use aiops_core::WorkflowStore;
use aiops_core::WorkflowStoreError;
use rusqlite::params;
use rusqlite::OptionalExtension;

use crate::error::SqliteStoreError;
use crate::store::SqliteStore;

impl SqliteStore {
    /// Lists every materialized incident record, ordered by id. Not part of
    /// [`WorkflowStore`]: the trait's seam is scoped to what the workflow
    /// driver needs (load/save one incident at a time), while a listing
    /// operation is only ever needed by an operator-facing reader such as
    /// the CLI's `incidents list` command.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query or a record's
    /// deserialization fails.
    pub fn list_incidents(&self) -> Result<Vec<Incident>, SqliteStoreError> {
        let guard = self.connection.lock().map_err(|_| SqliteStoreError::Db("sqlite mutex poisoned".to_owned()))?;
        let mut statement = guard.prepare("SELECT data_json FROM incidents ORDER BY id ASC")?;
        let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|json| serde_json::from_str(&json).map_err(SqliteStoreError::from))
            .collect()
    }

    /// Looks up a remediation action by its own `id`, as opposed to
    /// [`WorkflowStore::load_action_by_idempotency_key`], which is keyed on
    /// the derived idempotency key the executor's cache uses. An
    /// operator-facing reader (the CLI's `approve`/`execute`/`verify`
    /// commands) only ever has the action id on hand, never its parameters
    /// hash, so it needs this second lookup path against the same table.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query or deserialization fails.
    pub fn load_action(&self, action_id: &aiops_core::ActionId) -> Result<Option<RemediationAction>, SqliteStoreError> {
        let guard = self.connection.lock().map_err(|_| SqliteStoreError::Db("sqlite mutex poisoned".to_owned()))?;
        let data_json: Option<String> = guard
            .query_row("SELECT data_json FROM actions WHERE id = ?1", params![action_id.as_str()], |row| {
                row.get(0)
            })
            .optional()?;
        data_json.map(|json| serde_json::from_str(&json).map_err(SqliteStoreError::from)).transpose()
    }
}

impl WorkflowStore for SqliteStore {
    fn append_event(&self, incident_id: &IncidentId, event_json: &str) -> Result<(), WorkflowStoreError> {
        let guard =
            self.connection.lock().map_err(|_| WorkflowStoreError::Io("sqlite mutex poisoned".to_owned()))?;
        let next_seq: i64 = guard
            .query_row(
                "SELECT COALESCE(MAX(seq), 0) + 1 FROM journal WHERE incident_id = ?1",
                params![incident_id.as_str()],
                |row| row.get(0),
            )
            .map_err(|err| WorkflowStoreError::Io(err.to_string()))?;
        guard
            .execute(
                "INSERT INTO journal (incident_id, seq, event_json) VALUES (?1, ?2, ?3)",
                params![incident_id.as_str(), next_seq, event_json],
            )
            .map_err(|err| WorkflowStoreError::Io(err.to_string()))?;
        Ok(())
    }

    fn load_journal(&self, incident_id: &IncidentId) -> Result<Vec<String>, WorkflowStoreError> {
        let guard =
            self.connection.lock().map_err(|_| WorkflowStoreError::Io("sqlite mutex poisoned".to_owned()))?;
        let mut statement = guard
            .prepare("SELECT event_json FROM journal WHERE incident_id = ?1 ORDER BY seq ASC")
            .map_err(|err| WorkflowStoreError::Io(err.to_string()))?;
        let rows = statement
            .query_map(params![incident_id.as_str()], |row| row.get::<_, String>(0))
            .map_err(|err| WorkflowStoreError::Io(err.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(|err| WorkflowStoreError::Io(err.to_string()))
    }

    fn load_incident(&self, incident_id: &IncidentId) -> Result<Option<Incident>, WorkflowStoreError> {
        let guard =
            self.connection.lock().map_err(|_| WorkflowStoreError::Io("sqlite mutex poisoned".to_owned()))?;
        let data_json: Option<String> = guard
            .query_row("SELECT data_json FROM incidents WHERE id = ?1", params![incident_id.as_str()], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|err| WorkflowStoreError::Io(err.to_string()))?;
        data_json
            .map(|json| serde_json::from_str(&json).map_err(|err| WorkflowStoreError::Corrupt(err.to_string())))
            .transpose()
    }

    fn save_incident(&self, incident: &Incident) -> Result<(), WorkflowStoreError> {
        let data_json =
            serde_json::to_string(incident).map_err(|err| WorkflowStoreError::Invalid(err.to_string()))?;
        let guard =
            self.connection.lock().map_err(|_| WorkflowStoreError::Io("sqlite mutex poisoned".to_owned()))?;
        guard
            .execute(
                "INSERT INTO incidents (id, data_json) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET data_json = excluded.data_json",
                params![incident.id.as_str(), data_json],
            )
            .map_err(|err| WorkflowStoreError::Io(err.to_string()))?;
        Ok(())
    }

    fn load_action_by_idempotency_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<RemediationAction>, WorkflowStoreError> {
        let guard =
            self.connection.lock().map_err(|_| WorkflowStoreError::Io("sqlite mutex poisoned".to_owned()))?;
        let data_json: Option<String> = guard
            .query_row("SELECT data_json FROM actions WHERE idempotency_key = ?1", params![idempotency_key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|err| WorkflowStoreError::Io(err.to_string()))?;
        data_json
            .map(|json| serde_json::from_str(&json).map_err(|err| WorkflowStoreError::Corrupt(err.to_string())))
            .transpose()
    }

    fn save_action(&self, action: &RemediationAction) -> Result<(), WorkflowStoreError> {
        let data_json = serde_json::to_string(action).map_err(|err| WorkflowStoreError::Invalid(err.to_string()))?;
        let guard =
            self.connection.lock().map_err(|_| WorkflowStoreError::Io("sqlite mutex poisoned".to_owned()))?;
        guard
            .execute(
                "INSERT INTO actions (idempotency_key, id, data_json) VALUES (?1, ?2, ?3)
                 ON CONFLICT(idempotency_key) DO UPDATE SET id = excluded.id, data_json = excluded.data_json",
                params![action.idempotency_key.as_str(), action.id.as_str(), data_json],
            )
            .map_err(|err| WorkflowStoreError::Io(err.to_string()))?;
        Ok(())
    }

    fn save_verification(
        &self,
        verification_id: &VerificationId,
        result: &VerificationResult,
    ) -> Result<(), WorkflowStoreError> {
        let data_json = serde_json::to_string(result).map_err(|err| WorkflowStoreError::Invalid(err.to_string()))?;
        let guard =
            self.connection.lock().map_err(|_| WorkflowStoreError::Io("sqlite mutex poisoned".to_owned()))?;
        guard
            .execute(
                "INSERT INTO verifications (id, action_id, data_json) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET action_id = excluded.action_id, data_json = excluded.data_json",
                params![verification_id.as_str(), result.action_id.as_str(), data_json],
            )
            .map_err(|err| WorkflowStoreError::Io(err.to_string()))?;
        Ok(())
    }

    fn readiness(&self) -> Result<(), WorkflowStoreError> {
        self.check_connection().map_err(WorkflowStoreError::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test setup only")]
mod tests {
    use std::collections::BTreeMap;

    use aiops_core::ActionId;
    use aiops_core::ActionStatus;
    use aiops_core::ActionType;
    use aiops_core::ClusterId;
    use aiops_core::HypothesisId;
    use aiops_core::IdempotencyKey;
    use aiops_core::Incident;
    use aiops_core::IncidentId;
    use aiops_core::IncidentStatus;
    use aiops_core::RemediationAction;
    use aiops_core::RiskLevel;
    use aiops_core::Severity;
    use aiops_core::Timestamp;
    use aiops_core::VerificationId;
    use aiops_core::VerificationMetrics;
    use aiops_core::VerificationResult;
    use aiops_core::WorkflowStore;
    use tempfile::tempdir;

    use crate::store::SqliteStore;

    fn sample_incident() -> Incident {
        Incident {
            id: IncidentId::new("inc-1"),
            fingerprint: "fp-1".to_owned(),
            title: "checkout pods crash-looping".to_owned(),
            severity: Severity::Critical,
            status: IncidentStatus::Open,
            source: "alertmanager".to_owned(),
            cluster: ClusterId::new("us-east-1"),
            namespace: "payments".to_owned(),
            service: Some("checkout".to_owned()),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            started_at: Timestamp::Logical(1),
            acknowledged_at: None,
            resolved_at: None,
        }
    }

    fn sample_action() -> RemediationAction {
        RemediationAction {
            id: ActionId::new("action-1"),
            incident_id: IncidentId::new("inc-1"),
            hypothesis_id: Some(HypothesisId::new("hyp-1")),
            idempotency_key: IdempotencyKey::new("key-1"),
            action_type: ActionType::RestartPod,
            target_resource: "checkout-7f".to_owned(),
            target_namespace: "payments".to_owned(),
            parameters: BTreeMap::new(),
            risk_level: RiskLevel::Low,
            blast_radius_score: 10.0,
            status: ActionStatus::Proposed,
            requires_approval: false,
            approved_by: None,
            approved_at: None,
            executed_at: None,
            completed_at: None,
            execution_result: None,
        }
    }

    #[test]
    fn journal_appends_preserve_order() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open_at(dir.path().join("store.sqlite3")).unwrap();
        let incident_id = IncidentId::new("inc-1");
        store.append_event(&incident_id, "{\"n\":1}").unwrap();
        store.append_event(&incident_id, "{\"n\":2}").unwrap();
        let journal = store.load_journal(&incident_id).unwrap();
        assert_eq!(journal, vec!["{\"n\":1}".to_owned(), "{\"n\":2}".to_owned()]);
    }

    #[test]
    fn incident_round_trips_through_save_and_load() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open_at(dir.path().join("store.sqlite3")).unwrap();
        let incident = sample_incident();
        store.save_incident(&incident).unwrap();
        let loaded = store.load_incident(&incident.id).unwrap().expect("incident present");
        assert_eq!(loaded, incident);
    }

    #[test]
    fn missing_incident_loads_as_none() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open_at(dir.path().join("store.sqlite3")).unwrap();
        assert_eq!(store.load_incident(&IncidentId::new("missing")).unwrap(), None);
    }

    #[test]
    fn action_lookup_by_idempotency_key_supports_executor_caching() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open_at(dir.path().join("store.sqlite3")).unwrap();
        let action = sample_action();
        store.save_action(&action).unwrap();
        let loaded = store.load_action_by_idempotency_key(action.idempotency_key.as_str()).unwrap();
        assert_eq!(loaded, Some(action));
    }

    #[test]
    fn action_lookup_by_id_finds_a_saved_action() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open_at(dir.path().join("store.sqlite3")).unwrap();
        let action = sample_action();
        store.save_action(&action).unwrap();
        let loaded = store.load_action(&action.id).unwrap();
        assert_eq!(loaded, Some(action));
    }

    #[test]
    fn action_lookup_by_id_on_an_unknown_action_returns_none() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open_at(dir.path().join("store.sqlite3")).unwrap();
        assert_eq!(store.load_action(&ActionId::new("missing")).unwrap(), None);
    }

    #[test]
    fn verification_saves_without_error() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open_at(dir.path().join("store.sqlite3")).unwrap();
        let result = VerificationResult {
            id: VerificationId::new("verify-1"),
            action_id: ActionId::new("action-1"),
            success: true,
            metrics_improved: true,
            metrics: VerificationMetrics {
                error_rate_before: 0.2,
                error_rate_after: 0.01,
                latency_before: 1.2,
                latency_after: 0.3,
                restart_count_delta_post: 0,
                pods_ready_ratio: 1.0,
            },
        };
        store.save_verification(&result.id, &result).unwrap();
    }

    #[test]
    fn readiness_reports_ok_for_an_open_store() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open_at(dir.path().join("store.sqlite3")).unwrap();
        store.readiness().unwrap();
    }
}
