use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::area::ApproverId;
use crate::domain::request::RequestId;
use crate::errors::WorkflowError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalEntryId(pub String);

/// Outcome of one approver's review. `Pending` is the seeded state and is
/// never a recordable decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Pending,
    Approved,
    Rejected,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parse a wire value once at the boundary. Anything other than the
    /// three canonical lowercase strings is rejected.
    pub fn parse(raw: &str) -> Result<Self, WorkflowError> {
        match raw {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(WorkflowError::Validation(format!(
                "decision must be `approved` or `rejected`, got `{other}`"
            ))),
        }
    }
}

/// One approver's decision record on one request. At most one entry exists
/// per (request, approver) pair; the full set is replaced when the request
/// is edited.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalEntry {
    pub id: ApprovalEntryId,
    pub request_id: RequestId,
    pub approver_id: ApproverId,
    pub decision: Decision,
    pub comment: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    /// Seed order; `list_for` returns entries sorted by this.
    pub position: u32,
}

impl ApprovalEntry {
    pub fn is_pending(&self) -> bool {
        self.decision == Decision::Pending
    }
}
