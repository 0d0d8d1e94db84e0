use sqlx::Executor;

use crate::repositories::RepositoryError;
use crate::DbPool;

/// Deterministic demo dataset covering one request in each lifecycle
/// status, used by `picflow seed` and by manual testing.
pub struct SeedDataset;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub areas: u64,
    pub requests: u64,
    pub entries: u64,
}

impl SeedDataset {
    pub const SQL: &'static str = include_str!("../../../config/fixtures/seed_data.sql");

    const SEED_REQUEST_IDS: &'static [&'static str] =
        &["pic-seed-pending", "pic-seed-approved", "pic-seed-rejected"];
    const SEED_AREA_IDS: &'static [&'static str] = &["area-assembly", "area-test"];

    /// Load the dataset in one transaction. Existing seed rows are removed
    /// first so reseeding is idempotent.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        for id in Self::SEED_REQUEST_IDS {
            sqlx::query("DELETE FROM change_request WHERE id = ?").bind(id).execute(&mut *tx).await?;
        }
        for id in Self::SEED_AREA_IDS {
            sqlx::query("DELETE FROM affected_area WHERE id = ?").bind(id).execute(&mut *tx).await?;
        }

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Self::verify(pool).await
    }

    /// Count the seed rows actually present, for `seed` command output.
    pub async fn verify(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let areas: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM affected_area WHERE id IN ('area-assembly', 'area-test')",
        )
        .fetch_one(pool)
        .await?;
        let requests: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM change_request WHERE id LIKE 'pic-seed-%'",
        )
        .fetch_one(pool)
        .await?;
        let entries: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM approval_entry WHERE request_id LIKE 'pic-seed-%'",
        )
        .fetch_one(pool)
        .await?;

        Ok(SeedResult { areas: areas as u64, requests: requests as u64, entries: entries as u64 })
    }
}
