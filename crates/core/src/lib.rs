pub mod approvers;
pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod workflow;

pub use approvers::{can_remove, dedup_approvers, ensure_removable, reconcile, resolve_mandatory};
pub use domain::approval::{ApprovalEntry, ApprovalEntryId, Decision};
pub use domain::area::{ActorId, AffectedArea, ApproverId, ApproverRef, AreaId};
pub use domain::request::{
    Availability, ChangeReason, ChangeRequest, RequestDraft, RequestId, RequestStatus,
};
pub use errors::WorkflowError;
pub use workflow::{can_delete, can_edit, derive_status};
