use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Row, SqliteConnection};

use picflow_core::domain::area::{ActorId, AreaId};
use picflow_core::domain::request::{
    Availability, ChangeReason, ChangeRequest, RequestId, RequestStatus,
};

use super::RepositoryError;

const REQUEST_COLUMNS: &str = "id, affected_area_id, status, platform, affected_part_numbers,
    part_numbers_text, is_temporary, temporary_type, origination_date, implementation_date,
    affected_operations, revision_reason, change_reason, availability, attachment_path,
    created_by, created_at, updated_at";

fn decode<T>(result: Result<T, sqlx::Error>) -> Result<T, RepositoryError> {
    result.map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn parse_date(raw: &str, column: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

fn parse_timestamp(raw: &str, column: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

pub(crate) fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<ChangeRequest, RepositoryError> {
    let id: String = decode(row.try_get("id"))?;
    let affected_area_id: Option<String> = decode(row.try_get("affected_area_id"))?;
    let status_str: String = decode(row.try_get("status"))?;
    let platform: String = decode(row.try_get("platform"))?;
    let affected_part_numbers: String = decode(row.try_get("affected_part_numbers"))?;
    let part_numbers_text: Option<String> = decode(row.try_get("part_numbers_text"))?;
    let temporary: bool = decode(row.try_get("is_temporary"))?;
    let temporary_type: Option<String> = decode(row.try_get("temporary_type"))?;
    let origination_date: String = decode(row.try_get("origination_date"))?;
    let implementation_date: String = decode(row.try_get("implementation_date"))?;
    let affected_operations: String = decode(row.try_get("affected_operations"))?;
    let revision_reason: String = decode(row.try_get("revision_reason"))?;
    let change_reason_json: String = decode(row.try_get("change_reason"))?;
    let availability_json: String = decode(row.try_get("availability"))?;
    let attachment_path: Option<String> = decode(row.try_get("attachment_path"))?;
    let created_by: String = decode(row.try_get("created_by"))?;
    let created_at: String = decode(row.try_get("created_at"))?;
    let updated_at: String = decode(row.try_get("updated_at"))?;

    let status = RequestStatus::parse(&status_str)
        .map_err(|e| RepositoryError::Decode(format!("status for request {id}: {e}")))?;
    let change_reason: ChangeReason = serde_json::from_str(&change_reason_json)
        .map_err(|e| RepositoryError::Decode(format!("change_reason for request {id}: {e}")))?;
    let availability: Availability = serde_json::from_str(&availability_json)
        .map_err(|e| RepositoryError::Decode(format!("availability for request {id}: {e}")))?;

    Ok(ChangeRequest {
        id: RequestId(id),
        affected_area_id: affected_area_id.map(AreaId),
        status,
        platform,
        affected_part_numbers,
        part_numbers_text,
        temporary,
        temporary_type,
        origination_date: parse_date(&origination_date, "origination_date")?,
        implementation_date: parse_date(&implementation_date, "implementation_date")?,
        affected_operations,
        revision_reason,
        change_reason,
        availability,
        attachment_path,
        created_by: ActorId(created_by),
        created_at: parse_timestamp(&created_at, "created_at")?,
        updated_at: parse_timestamp(&updated_at, "updated_at")?,
    })
}

pub async fn insert(
    conn: &mut SqliteConnection,
    request: &ChangeRequest,
) -> Result<(), RepositoryError> {
    let change_reason = serde_json::to_string(&request.change_reason)
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let availability = serde_json::to_string(&request.availability)
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;

    sqlx::query(
        "INSERT INTO change_request (id, affected_area_id, status, platform,
             affected_part_numbers, part_numbers_text, is_temporary, temporary_type,
             origination_date, implementation_date, affected_operations, revision_reason,
             change_reason, availability, attachment_path, created_by, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&request.id.0)
    .bind(request.affected_area_id.as_ref().map(|id| id.0.as_str()))
    .bind(request.status.as_str())
    .bind(&request.platform)
    .bind(&request.affected_part_numbers)
    .bind(&request.part_numbers_text)
    .bind(request.temporary)
    .bind(&request.temporary_type)
    .bind(request.origination_date.format("%Y-%m-%d").to_string())
    .bind(request.implementation_date.format("%Y-%m-%d").to_string())
    .bind(&request.affected_operations)
    .bind(&request.revision_reason)
    .bind(&change_reason)
    .bind(&availability)
    .bind(&request.attachment_path)
    .bind(&request.created_by.0)
    .bind(request.created_at.to_rfc3339())
    .bind(request.updated_at.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(())
}

/// Overwrite every author-editable field plus status and `updated_at`.
/// `id`, `created_by`, and `created_at` never change.
pub async fn update(
    conn: &mut SqliteConnection,
    request: &ChangeRequest,
) -> Result<(), RepositoryError> {
    let change_reason = serde_json::to_string(&request.change_reason)
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let availability = serde_json::to_string(&request.availability)
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;

    sqlx::query(
        "UPDATE change_request SET
             affected_area_id = ?, status = ?, platform = ?, affected_part_numbers = ?,
             part_numbers_text = ?, is_temporary = ?, temporary_type = ?, origination_date = ?,
             implementation_date = ?, affected_operations = ?, revision_reason = ?,
             change_reason = ?, availability = ?, attachment_path = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(request.affected_area_id.as_ref().map(|id| id.0.as_str()))
    .bind(request.status.as_str())
    .bind(&request.platform)
    .bind(&request.affected_part_numbers)
    .bind(&request.part_numbers_text)
    .bind(request.temporary)
    .bind(&request.temporary_type)
    .bind(request.origination_date.format("%Y-%m-%d").to_string())
    .bind(request.implementation_date.format("%Y-%m-%d").to_string())
    .bind(&request.affected_operations)
    .bind(&request.revision_reason)
    .bind(&change_reason)
    .bind(&availability)
    .bind(&request.attachment_path)
    .bind(request.updated_at.to_rfc3339())
    .bind(&request.id.0)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn set_status(
    conn: &mut SqliteConnection,
    id: &RequestId,
    status: RequestStatus,
    updated_at: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE change_request SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(updated_at.to_rfc3339())
        .bind(&id.0)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    id: &RequestId,
) -> Result<Option<ChangeRequest>, RepositoryError> {
    let row = sqlx::query(&format!("SELECT {REQUEST_COLUMNS} FROM change_request WHERE id = ?"))
        .bind(&id.0)
        .fetch_optional(conn)
        .await?;

    match row {
        Some(ref r) => Ok(Some(row_to_request(r)?)),
        None => Ok(None),
    }
}

/// All requests, newest first — the dashboard listing order.
pub async fn list_all(conn: &mut SqliteConnection) -> Result<Vec<ChangeRequest>, RepositoryError> {
    let rows = sqlx::query(&format!(
        "SELECT {REQUEST_COLUMNS} FROM change_request ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(conn)
    .await?;

    rows.iter().map(row_to_request).collect()
}

pub async fn delete(conn: &mut SqliteConnection, id: &RequestId) -> Result<bool, RepositoryError> {
    let result =
        sqlx::query("DELETE FROM change_request WHERE id = ?").bind(&id.0).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}
