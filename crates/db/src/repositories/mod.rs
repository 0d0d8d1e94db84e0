use async_trait::async_trait;
use thiserror::Error;

use picflow_core::domain::area::{AffectedArea, AreaId};
use picflow_core::errors::WorkflowError;

pub mod approval;
pub mod area;
pub mod request;

pub use area::SqlAreaRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for WorkflowError {
    fn from(error: RepositoryError) -> Self {
        WorkflowError::Storage(error.to_string())
    }
}

/// Configuration provider: the mandatory-approver data produced by
/// administrators. The admin UI itself is out of scope; this is the data
/// it writes.
#[async_trait]
pub trait AreaRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<AffectedArea>, RepositoryError>;
    async fn find_by_id(&self, id: &AreaId) -> Result<Option<AffectedArea>, RepositoryError>;
    async fn save(&self, area: AffectedArea) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &AreaId) -> Result<bool, RepositoryError>;
}
