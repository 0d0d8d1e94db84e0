//! Lifecycle state machine for change requests.
//!
//! A request's status is a pure function of its approval ledger: one
//! rejection anywhere makes the request `Rejected`, a non-empty ledger of
//! unanimous approvals makes it `Approved`, anything else leaves it
//! `Pending`. Rejection is sticky at request granularity; outstanding
//! `pending` entries stay in the ledger but stop mattering. The only exit
//! from a terminal status is an explicit edit, which resets the request to
//! `Pending` and replaces the ledger wholesale.

use crate::domain::approval::{ApprovalEntry, Decision};
use crate::domain::request::{ChangeRequest, RequestStatus};
use crate::errors::WorkflowError;

/// Derive the request status from its full ledger.
///
/// An empty ledger yields `Pending`, never `Approved`: a request nobody
/// reviews must not silently pass. Such a request can only be resolved by
/// administrative intervention.
pub fn derive_status(entries: &[ApprovalEntry]) -> RequestStatus {
    if entries.iter().any(|entry| entry.decision == Decision::Rejected) {
        return RequestStatus::Rejected;
    }
    if !entries.is_empty() && entries.iter().all(|entry| entry.decision == Decision::Approved) {
        return RequestStatus::Approved;
    }
    RequestStatus::Pending
}

/// Whether the request may be edited. Only rejected requests are editable.
pub fn can_edit(request: &ChangeRequest) -> bool {
    request.status == RequestStatus::Rejected
}

/// Whether the request may be deleted. Same policy as editing.
pub fn can_delete(request: &ChangeRequest) -> bool {
    request.status == RequestStatus::Rejected
}

/// Guard form of [`can_edit`] for mutation paths.
pub fn ensure_editable(request: &ChangeRequest) -> Result<(), WorkflowError> {
    if can_edit(request) {
        return Ok(());
    }
    Err(WorkflowError::Permission(format!(
        "only rejected requests may be edited (request {} is {})",
        request.id.0,
        request.status.as_str()
    )))
}

/// Guard form of [`can_delete`] for mutation paths.
pub fn ensure_deletable(request: &ChangeRequest) -> Result<(), WorkflowError> {
    if can_delete(request) {
        return Ok(());
    }
    Err(WorkflowError::Permission(format!(
        "only rejected requests may be deleted (request {} is {})",
        request.id.0,
        request.status.as_str()
    )))
}

/// Validate a decision before it is recorded: only `approved`/`rejected`
/// are recordable, and a non-blank comment is required for both outcomes.
/// The comment rule is product policy (rationale capture), enforced here
/// rather than left to any UI.
pub fn validate_decision(decision: Decision, comment: &str) -> Result<(), WorkflowError> {
    if decision == Decision::Pending {
        return Err(WorkflowError::Validation(
            "decision must be `approved` or `rejected`".to_string(),
        ));
    }
    if comment.trim().is_empty() {
        return Err(WorkflowError::Validation(
            "a comment is required when approving or rejecting".to_string(),
        ));
    }
    Ok(())
}
