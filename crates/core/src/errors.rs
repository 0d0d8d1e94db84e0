use thiserror::Error;

use crate::domain::area::{ApproverId, AreaId};

/// Error taxonomy of the workflow core. Every variant is terminal for the
/// operation that raised it; the HTTP layer maps variants to user-facing
/// responses, and notification failures never appear here at all (they are
/// logged and swallowed by the sender).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("approver `{approver_id}` is mandatory for area `{area_id}` and cannot be removed")]
    MandatoryApprover { approver_id: ApproverId, area_id: AreaId },
    #[error("approver `{approver_id}` appears more than once in the approver list")]
    DuplicateApprover { approver_id: ApproverId },
    #[error("operation not permitted: {0}")]
    Permission(String),
    #[error("storage failure: {0}")]
    Storage(String),
}

impl WorkflowError {
    /// Stable machine-readable class for structured logs and API payloads.
    pub fn class(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::MandatoryApprover { .. } => "mandatory_approver",
            Self::DuplicateApprover { .. } => "duplicate_approver",
            Self::Permission(_) => "permission",
            Self::Storage(_) => "storage",
        }
    }
}
