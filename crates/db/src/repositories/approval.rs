use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};

use picflow_core::domain::approval::{ApprovalEntry, ApprovalEntryId, Decision};
use picflow_core::domain::area::{ApproverId, ApproverRef};
use picflow_core::domain::request::RequestId;
use picflow_core::errors::WorkflowError;
use uuid::Uuid;

use super::RepositoryError;

const ENTRY_COLUMNS: &str =
    "id, request_id, approver_id, decision, comment, decided_at, position";

fn decode<T>(result: Result<T, sqlx::Error>) -> Result<T, RepositoryError> {
    result.map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalEntry, RepositoryError> {
    let id: String = decode(row.try_get("id"))?;
    let request_id: String = decode(row.try_get("request_id"))?;
    let approver_id: String = decode(row.try_get("approver_id"))?;
    let decision_str: String = decode(row.try_get("decision"))?;
    let comment: Option<String> = decode(row.try_get("comment"))?;
    let decided_at_str: Option<String> = decode(row.try_get("decided_at"))?;
    let position: i64 = decode(row.try_get("position"))?;

    let decision = Decision::parse(&decision_str)
        .map_err(|e| RepositoryError::Decode(format!("decision for entry {id}: {e}")))?;
    let decided_at = match decided_at_str {
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| RepositoryError::Decode(format!("decided_at for entry {id}: {e}")))?,
        ),
        None => None,
    };

    Ok(ApprovalEntry {
        id: ApprovalEntryId(id),
        request_id: RequestId(request_id),
        approver_id: ApproverId(approver_id),
        decision,
        comment,
        decided_at,
        position: position as u32,
    })
}

/// Create one `pending` entry per approver, in list order. The only way
/// entries come into existence; a repeated approver id in the input fails
/// the whole seed with `DuplicateApprover` before anything is written.
pub async fn seed(
    conn: &mut SqliteConnection,
    request_id: &RequestId,
    approvers: &[ApproverRef],
) -> Result<Vec<ApprovalEntry>, WorkflowError> {
    let mut seen: HashSet<&ApproverId> = HashSet::with_capacity(approvers.len());
    for approver in approvers {
        if !seen.insert(&approver.approver_id) {
            return Err(WorkflowError::DuplicateApprover {
                approver_id: approver.approver_id.clone(),
            });
        }
    }

    let now = Utc::now();
    let mut entries = Vec::with_capacity(approvers.len());
    for (position, approver) in approvers.iter().enumerate() {
        let entry = ApprovalEntry {
            id: ApprovalEntryId(Uuid::new_v4().to_string()),
            request_id: request_id.clone(),
            approver_id: approver.approver_id.clone(),
            decision: Decision::Pending,
            comment: None,
            decided_at: None,
            position: position as u32,
        };

        sqlx::query(
            "INSERT INTO approval_entry (id, request_id, approver_id, decision, position, created_at)
             VALUES (?, ?, ?, 'pending', ?, ?)",
        )
        .bind(&entry.id.0)
        .bind(&entry.request_id.0)
        .bind(&entry.approver_id.0)
        .bind(entry.position)
        .bind(now.to_rfc3339())
        .execute(&mut *conn)
        .await
        .map_err(|e| WorkflowError::Storage(e.to_string()))?;

        entries.push(entry);
    }

    Ok(entries)
}

/// Entries for a request in seed order.
pub async fn list_for(
    conn: &mut SqliteConnection,
    request_id: &RequestId,
) -> Result<Vec<ApprovalEntry>, RepositoryError> {
    let rows = sqlx::query(&format!(
        "SELECT {ENTRY_COLUMNS} FROM approval_entry WHERE request_id = ? ORDER BY position ASC"
    ))
    .bind(&request_id.0)
    .fetch_all(conn)
    .await?;

    rows.iter().map(row_to_entry).collect()
}

/// Write a decision onto the still-pending entry for (request, approver).
/// The pending-only predicate lives in the UPDATE itself, so an
/// already-decided approver (or one who is not part of the request) hits
/// zero rows instead of overwriting a recorded vote. Issued as the first
/// statement of the decision transaction so the write lock is taken before
/// any read.
pub async fn apply_decision(
    conn: &mut SqliteConnection,
    request_id: &RequestId,
    approver_id: &ApproverId,
    decision: Decision,
    comment: &str,
    decided_at: DateTime<Utc>,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE approval_entry SET decision = ?, comment = ?, decided_at = ?
         WHERE request_id = ? AND approver_id = ? AND decision = 'pending'",
    )
    .bind(decision.as_str())
    .bind(comment)
    .bind(decided_at.to_rfc3339())
    .bind(&request_id.0)
    .bind(&approver_id.0)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// The entry for (request, approver) regardless of decision state.
pub async fn find_entry(
    conn: &mut SqliteConnection,
    request_id: &RequestId,
    approver_id: &ApproverId,
) -> Result<Option<ApprovalEntry>, RepositoryError> {
    let row = sqlx::query(&format!(
        "SELECT {ENTRY_COLUMNS} FROM approval_entry
         WHERE request_id = ? AND approver_id = ?"
    ))
    .bind(&request_id.0)
    .bind(&approver_id.0)
    .fetch_optional(conn)
    .await?;

    match row {
        Some(ref r) => Ok(Some(row_to_entry(r)?)),
        None => Ok(None),
    }
}

pub async fn delete_for_request(
    conn: &mut SqliteConnection,
    request_id: &RequestId,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query("DELETE FROM approval_entry WHERE request_id = ?")
        .bind(&request_id.0)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Pending entries assigned to one approver across all requests — the
/// "waiting on you" dashboard query.
pub async fn pending_for_approver(
    conn: &mut SqliteConnection,
    approver_id: &ApproverId,
) -> Result<Vec<ApprovalEntry>, RepositoryError> {
    let rows = sqlx::query(&format!(
        "SELECT {ENTRY_COLUMNS} FROM approval_entry
         WHERE approver_id = ? AND decision = 'pending'
         ORDER BY created_at ASC"
    ))
    .bind(&approver_id.0)
    .fetch_all(conn)
    .await?;

    rows.iter().map(row_to_entry).collect()
}
