use chrono::Utc;
use sqlx::Row;

use picflow_core::domain::area::{AffectedArea, ApproverRef, AreaId};

use super::{AreaRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAreaRepository {
    pool: DbPool,
}

impl SqlAreaRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_area(row: &sqlx::sqlite::SqliteRow) -> Result<AffectedArea, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approvers_json: String = row
        .try_get("mandatory_approvers")
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let mandatory_approvers: Vec<ApproverRef> = serde_json::from_str(&approvers_json)
        .map_err(|e| RepositoryError::Decode(format!("mandatory_approvers for area {id}: {e}")))?;

    Ok(AffectedArea { id: AreaId(id), name, mandatory_approvers })
}

#[async_trait::async_trait]
impl AreaRepository for SqlAreaRepository {
    async fn list(&self) -> Result<Vec<AffectedArea>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, mandatory_approvers FROM affected_area ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_area).collect()
    }

    async fn find_by_id(&self, id: &AreaId) -> Result<Option<AffectedArea>, RepositoryError> {
        let row =
            sqlx::query("SELECT id, name, mandatory_approvers FROM affected_area WHERE id = ?")
                .bind(&id.0)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_area(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, area: AffectedArea) -> Result<(), RepositoryError> {
        let approvers_json = serde_json::to_string(&area.mandatory_approvers)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO affected_area (id, name, mandatory_approvers, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 mandatory_approvers = excluded.mandatory_approvers,
                 updated_at = excluded.updated_at",
        )
        .bind(&area.id.0)
        .bind(&area.name)
        .bind(&approvers_json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &AreaId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM affected_area WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
