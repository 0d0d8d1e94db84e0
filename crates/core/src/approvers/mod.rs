//! Approver-set resolution for change requests.
//!
//! An affected area mandates a set of approvers; authors may add more. The
//! functions here compute the merged list, keep it in sync when the author
//! switches areas, and decide whether a given approver may be removed.
//! All of them are pure over the configured area list and are invoked only
//! at well-defined moments (initial area selection, area change, removal
//! attempt), never per render tick.

use std::collections::HashSet;

use crate::domain::area::{AffectedArea, ApproverId, ApproverRef, AreaId};
use crate::errors::WorkflowError;

/// Mandatory approvers configured for `area_id`, in configuration order.
/// Unset or unknown areas mandate nothing.
pub fn resolve_mandatory(areas: &[AffectedArea], area_id: Option<&AreaId>) -> Vec<ApproverRef> {
    area_id
        .and_then(|id| areas.iter().find(|area| &area.id == id))
        .map(|area| area.mandatory_approvers.clone())
        .unwrap_or_default()
}

/// Recompute an approver list after the author changes the selected area.
///
/// Approvers mandatory for the previous area but not the new one are
/// dropped; approvers mandatory for the new area and not already present
/// are appended at the end. Everything retained keeps its relative order,
/// and an approver mandatory for both areas is left untouched rather than
/// removed and re-added. The result never contains a duplicate approver id.
pub fn reconcile(
    areas: &[AffectedArea],
    previous_area_id: Option<&AreaId>,
    new_area_id: Option<&AreaId>,
    current: &[ApproverRef],
) -> Vec<ApproverRef> {
    let old_mandatory: HashSet<&ApproverId> = resolve_ids(areas, previous_area_id);
    let new_mandatory_refs = resolve_mandatory(areas, new_area_id);
    let new_mandatory: HashSet<&ApproverId> =
        new_mandatory_refs.iter().map(|approver| &approver.approver_id).collect();

    let mut result: Vec<ApproverRef> = current
        .iter()
        .filter(|approver| {
            !old_mandatory.contains(&approver.approver_id)
                || new_mandatory.contains(&approver.approver_id)
        })
        .cloned()
        .collect();

    let mut present: HashSet<ApproverId> =
        result.iter().map(|approver| approver.approver_id.clone()).collect();
    for approver in new_mandatory_refs {
        if present.insert(approver.approver_id.clone()) {
            result.push(approver);
        }
    }

    result
}

/// Whether `approver_id` may be removed from a request currently tied to
/// `area_id`. False exactly when the approver is mandatory for that area.
pub fn can_remove(
    areas: &[AffectedArea],
    area_id: Option<&AreaId>,
    approver_id: &ApproverId,
) -> bool {
    !resolve_ids(areas, area_id).contains(approver_id)
}

/// Guard form of [`can_remove`] for the mutation path: removal attempts on
/// a mandatory approver fail instead of silently succeeding.
pub fn ensure_removable(
    areas: &[AffectedArea],
    area_id: Option<&AreaId>,
    approver_id: &ApproverId,
) -> Result<(), WorkflowError> {
    if can_remove(areas, area_id, approver_id) {
        return Ok(());
    }
    let area_id = area_id.cloned().unwrap_or_else(|| AreaId(String::new()));
    Err(WorkflowError::MandatoryApprover { approver_id: approver_id.clone(), area_id })
}

/// Collapse repeated approver ids in author input, keeping the first
/// occurrence of each and preserving order.
pub fn dedup_approvers(approvers: Vec<ApproverRef>) -> Vec<ApproverRef> {
    let mut seen: HashSet<ApproverId> = HashSet::with_capacity(approvers.len());
    approvers
        .into_iter()
        .filter(|approver| seen.insert(approver.approver_id.clone()))
        .collect()
}

fn resolve_ids<'a>(areas: &'a [AffectedArea], area_id: Option<&AreaId>) -> HashSet<&'a ApproverId> {
    area_id
        .and_then(|id| areas.iter().find(|area| &area.id == id))
        .map(|area| area.mandatory_approvers.iter().map(|approver| &approver.approver_id).collect())
        .unwrap_or_default()
}
