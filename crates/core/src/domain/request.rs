use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::area::{ActorId, ApproverRef, AreaId};
use crate::errors::WorkflowError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

/// Lifecycle status of a change request. Always derived from the approval
/// ledger (see `workflow::derive_status`); the only other legal write is the
/// edit-reset back to `Pending`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, WorkflowError> {
        match raw {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(WorkflowError::Validation(format!("unknown request status `{other}`"))),
        }
    }
}

/// Why the process change is being proposed. Carried opaquely by the core.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeReason {
    pub safety: bool,
    pub delivery: bool,
    pub productivity: bool,
    pub quality: bool,
    pub cost: bool,
    pub process: bool,
    pub other: Option<String>,
}

/// Availability of supporting equipment for the change.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub fixtures: bool,
    pub test_equipment: bool,
    pub other: Option<String>,
}

/// A Process Improvement Change record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub id: RequestId,
    pub affected_area_id: Option<AreaId>,
    pub status: RequestStatus,
    pub platform: String,
    pub affected_part_numbers: String,
    pub part_numbers_text: Option<String>,
    pub temporary: bool,
    pub temporary_type: Option<String>,
    pub origination_date: NaiveDate,
    pub implementation_date: NaiveDate,
    pub affected_operations: String,
    pub revision_reason: String,
    pub change_reason: ChangeReason,
    pub availability: Availability,
    pub attachment_path: Option<String>,
    pub created_by: ActorId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Author-supplied fields for creating or editing a request. The approver
/// list is the full edited list (mandatory plus chosen); the workflow
/// service reconciles and validates it before seeding the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDraft {
    pub affected_area_id: Option<AreaId>,
    pub platform: String,
    pub affected_part_numbers: String,
    pub part_numbers_text: Option<String>,
    pub temporary: bool,
    pub temporary_type: Option<String>,
    pub origination_date: NaiveDate,
    pub implementation_date: NaiveDate,
    pub affected_operations: String,
    pub revision_reason: String,
    pub change_reason: ChangeReason,
    pub availability: Availability,
    pub attachment_path: Option<String>,
    pub approvers: Vec<ApproverRef>,
}

impl RequestDraft {
    /// Structural validation applied before any persistence. Date ordering
    /// mirrors the original form: the change cannot be implemented before
    /// it originated.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.platform.trim().is_empty() {
            return Err(WorkflowError::Validation("platform is required".to_string()));
        }
        if self.revision_reason.trim().is_empty() {
            return Err(WorkflowError::Validation("revision reason is required".to_string()));
        }
        if self.implementation_date < self.origination_date {
            return Err(WorkflowError::Validation(format!(
                "implementation date {} precedes origination date {}",
                self.implementation_date, self.origination_date
            )));
        }
        Ok(())
    }
}
