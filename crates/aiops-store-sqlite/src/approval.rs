// aiops-store-sqlite/src/approval.rs
// ============================================================================
// Module: Approval Channel Implementation
// Description: Persists pending approval requests into the `approvals`
//              table and polls for an out-of-band resolution until the
//              request's deadline elapses.
// Dependencies: rusqlite, serde_json, std::thread, aiops-core
// ============================================================================

//! ## Overview
//! [`SqliteStore`] doubles as the approval transport (§6): [`ApprovalChannel::request`]
//! writes a pending row and blocks, polling, until a caller elsewhere (the
//! `approve`/`deny` command of a CLI host) resolves it via
//! [`SqliteStore::resolve_approval`], or until `deadline` elapses.

use std::thread::sleep;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use aiops_core::ActionId;
use aiops_core::ApprovalChannel;
use aiops_core::ApprovalError;
use aiops_core::ApprovalOutcome;
use aiops_core::Timestamp;
use rusqlite::params;
use rusqlite::OptionalExtension;

use crate::store::SqliteStore;

/// How long [`ApprovalChannel::request`] sleeps between polls of the
/// `approvals` table.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

impl SqliteStore {
    /// Records an out-of-band decision for `action_id`'s pending approval
    /// request. Has no effect if no request for `action_id` is pending.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::Transport`] if the update fails.
    pub fn resolve_approval(&self, action_id: &ActionId, outcome: ApprovalOutcome) -> Result<(), ApprovalError> {
        let guard =
            self.connection.lock().map_err(|_| ApprovalError::Transport("sqlite mutex poisoned".to_owned()))?;
        guard
            .execute(
                "UPDATE approvals SET outcome = ?1 WHERE action_id = ?2",
                params![approval_outcome_column(outcome), action_id.as_str()],
            )
            .map_err(|err| ApprovalError::Transport(err.to_string()))?;
        Ok(())
    }
}

impl ApprovalChannel for SqliteStore {
    fn request(
        &self,
        action_id: &ActionId,
        action_summary: &str,
        deadline: Timestamp,
    ) -> Result<ApprovalOutcome, ApprovalError> {
        let deadline_json =
            serde_json::to_string(&deadline).map_err(|err| ApprovalError::Transport(err.to_string()))?;
        {
            let guard =
                self.connection.lock().map_err(|_| ApprovalError::Transport("sqlite mutex poisoned".to_owned()))?;
            guard
                .execute(
                    "INSERT INTO approvals (action_id, outcome, action_summary, deadline_json)
                     VALUES (?1, NULL, ?2, ?3)
                     ON CONFLICT(action_id) DO UPDATE SET
                        action_summary = excluded.action_summary,
                        deadline_json = excluded.deadline_json",
                    params![action_id.as_str(), action_summary, deadline_json],
                )
                .map_err(|err| ApprovalError::Transport(err.to_string()))?;
        }
        loop {
            let recorded = {
                let guard = self
                    .connection
                    .lock()
                    .map_err(|_| ApprovalError::Transport("sqlite mutex poisoned".to_owned()))?;
                guard
                    .query_row(
                        "SELECT outcome FROM approvals WHERE action_id = ?1",
                        params![action_id.as_str()],
                        |row| row.get::<_, Option<String>>(0),
                    )
                    .optional()
                    .map_err(|err| ApprovalError::Transport(err.to_string()))?
                    .flatten()
            };
            if let Some(raw) = recorded {
                return parse_approval_outcome(&raw);
            }
            if deadline_has_elapsed(deadline) {
                return Ok(ApprovalOutcome::TimedOut);
            }
            sleep(POLL_INTERVAL);
        }
    }
}

/// Maps an [`ApprovalOutcome`] to the string stored in the `outcome` column.
const fn approval_outcome_column(outcome: ApprovalOutcome) -> &'static str {
    match outcome {
        ApprovalOutcome::Approved => "approved",
        ApprovalOutcome::Denied => "denied",
        ApprovalOutcome::TimedOut => "timed_out",
    }
}

/// Parses a stored `outcome` column value back into an [`ApprovalOutcome`].
fn parse_approval_outcome(raw: &str) -> Result<ApprovalOutcome, ApprovalError> {
    match raw {
        "approved" => Ok(ApprovalOutcome::Approved),
        "denied" => Ok(ApprovalOutcome::Denied),
        "timed_out" => Ok(ApprovalOutcome::TimedOut),
        other => Err(ApprovalError::Transport(format!("unrecognized approval outcome: {other}"))),
    }
}

/// Reports whether `deadline` has passed, relative to wall-clock time. A
/// `Logical` deadline has no wall-clock meaning and is always treated as
/// already elapsed, since this channel has no replay driver to advance it.
fn deadline_has_elapsed(deadline: Timestamp) -> bool {
    let Some(deadline_millis) = deadline.as_unix_millis() else {
        return true;
    };
    let now_millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(i64::MAX);
    now_millis >= deadline_millis
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test setup only")]
mod tests {
    use aiops_core::ActionId;
    use aiops_core::ApprovalChannel;
    use aiops_core::ApprovalOutcome;
    use aiops_core::Timestamp;
    use tempfile::tempdir;

    use crate::store::SqliteStore;

    #[test]
    fn a_pre_resolved_approval_returns_immediately() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open_at(dir.path().join("store.sqlite3")).unwrap();
        let action_id = ActionId::new("action-1");
        store.resolve_approval(&action_id, ApprovalOutcome::Approved).unwrap();
        let outcome = store.request(&action_id, "restart checkout pods", Timestamp::UnixMillis(0)).unwrap();
        assert_eq!(outcome, ApprovalOutcome::Approved);
    }

    #[test]
    fn a_past_deadline_times_out_without_a_decision() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open_at(dir.path().join("store.sqlite3")).unwrap();
        let action_id = ActionId::new("action-2");
        let outcome = store.request(&action_id, "scale deployment", Timestamp::UnixMillis(1)).unwrap();
        assert_eq!(outcome, ApprovalOutcome::TimedOut);
    }

    #[test]
    fn resolving_an_unknown_action_is_a_no_op() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open_at(dir.path().join("store.sqlite3")).unwrap();
        store.resolve_approval(&ActionId::new("never-requested"), ApprovalOutcome::Denied).unwrap();
    }
}
