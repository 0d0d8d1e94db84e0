//! Transactional application service for the PIC approval workflow.
//!
//! Handlers are stateless; every operation here opens its own transaction
//! against the pool and commits request mutations together with their
//! ledger changes. Identity arrives as an explicit [`ActorId`] argument on
//! every call. Notifications go out after commit, fire-and-forget.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use picflow_core::approvers::{dedup_approvers, ensure_removable, reconcile, resolve_mandatory};
use picflow_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use picflow_core::domain::approval::{ApprovalEntry, Decision};
use picflow_core::domain::area::{ActorId, AffectedArea, ApproverId, ApproverRef};
use picflow_core::domain::request::{ChangeRequest, RequestDraft, RequestId, RequestStatus};
use picflow_core::errors::WorkflowError;
use picflow_core::workflow::{derive_status, ensure_deletable, ensure_editable, validate_decision};
use picflow_notify::{dispatch, Notification, NotificationSender, RequestSummary};

use crate::repositories::{approval, request, AreaRepository, SqlAreaRepository};
use crate::DbPool;

/// Result of recording one approver's decision: the updated ledger entry
/// and the request status derived from the full ledger afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionOutcome {
    pub entry: ApprovalEntry,
    pub status: RequestStatus,
}

pub struct WorkflowService {
    pool: DbPool,
    areas: SqlAreaRepository,
    sender: Arc<dyn NotificationSender>,
    audit: Arc<dyn AuditSink>,
}

impl WorkflowService {
    pub fn new(
        pool: DbPool,
        sender: Arc<dyn NotificationSender>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let areas = SqlAreaRepository::new(pool.clone());
        Self { pool, areas, sender, audit }
    }

    /// Create a request in `pending` status with a freshly seeded ledger.
    ///
    /// The author's chosen approvers are deduplicated and merged with the
    /// mandatory approvers of the selected area (mandatory ones appended at
    /// the end when missing), so the seeded ledger always covers the area's
    /// requirements.
    pub async fn create_request(
        &self,
        draft: RequestDraft,
        actor: ActorId,
    ) -> Result<ChangeRequest, WorkflowError> {
        draft.validate()?;
        let areas = self.load_areas().await?;
        ensure_area_exists(&areas, &draft)?;

        let chosen = dedup_approvers(draft.approvers.clone());
        let approvers = reconcile(&areas, None, draft.affected_area_id.as_ref(), &chosen);

        let now = Utc::now();
        let request = ChangeRequest {
            id: RequestId(Uuid::new_v4().to_string()),
            affected_area_id: draft.affected_area_id.clone(),
            status: RequestStatus::Pending,
            platform: draft.platform.clone(),
            affected_part_numbers: draft.affected_part_numbers.clone(),
            part_numbers_text: draft.part_numbers_text.clone(),
            temporary: draft.temporary,
            temporary_type: draft.temporary_type.clone(),
            origination_date: draft.origination_date,
            implementation_date: draft.implementation_date,
            affected_operations: draft.affected_operations.clone(),
            revision_reason: draft.revision_reason.clone(),
            change_reason: draft.change_reason.clone(),
            availability: draft.availability.clone(),
            attachment_path: draft.attachment_path.clone(),
            created_by: actor.clone(),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.begin().await?;
        request::insert(&mut tx, &request).await?;
        approval::seed(&mut tx, &request.id, &approvers).await?;
        tx.commit().await.map_err(storage)?;

        info!(
            event_name = "workflow.request_created",
            request_id = %request.id.0,
            approver_count = approvers.len(),
            "change request created"
        );
        self.audit.emit(
            AuditEvent::new(
                Some(request.id.clone()),
                request.id.0.clone(),
                "request.created",
                AuditCategory::Request,
                actor.0.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("approvers", approvers.len().to_string()),
        );

        self.notify_seeded(&request, &approvers);
        Ok(request)
    }

    /// Destructive-replace edit: descriptive fields are overwritten, the
    /// prior ledger is discarded in full, a new one is seeded, and the
    /// status is reset to `pending` — all in one transaction. Only
    /// rejected requests may be edited.
    pub async fn edit_request(
        &self,
        id: &RequestId,
        draft: RequestDraft,
        actor: ActorId,
    ) -> Result<ChangeRequest, WorkflowError> {
        draft.validate()?;
        let areas = self.load_areas().await?;
        ensure_area_exists(&areas, &draft)?;

        // An edit that omits a mandatory approver of the chosen area is a
        // removal attempt and is rejected outright; creation auto-fills
        // instead, but an editor has already seen the reconciled list.
        let approvers = dedup_approvers(draft.approvers.clone());
        let supplied: HashSet<&ApproverId> =
            approvers.iter().map(|approver| &approver.approver_id).collect();
        for mandatory in resolve_mandatory(&areas, draft.affected_area_id.as_ref()) {
            if !supplied.contains(&mandatory.approver_id) {
                ensure_removable(&areas, draft.affected_area_id.as_ref(), &mandatory.approver_id)?;
            }
        }

        let mut tx = self.begin().await?;
        let existing = request::find_by_id(&mut tx, id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("no request with id {}", id.0)))?;
        if let Err(error) = ensure_editable(&existing) {
            self.audit.emit(AuditEvent::new(
                Some(id.clone()),
                id.0.clone(),
                "request.edit_rejected",
                AuditCategory::Request,
                actor.0.clone(),
                AuditOutcome::Rejected,
            ));
            return Err(error);
        }

        let now = Utc::now();
        let updated = ChangeRequest {
            id: existing.id.clone(),
            affected_area_id: draft.affected_area_id.clone(),
            status: RequestStatus::Pending,
            platform: draft.platform.clone(),
            affected_part_numbers: draft.affected_part_numbers.clone(),
            part_numbers_text: draft.part_numbers_text.clone(),
            temporary: draft.temporary,
            temporary_type: draft.temporary_type.clone(),
            origination_date: draft.origination_date,
            implementation_date: draft.implementation_date,
            affected_operations: draft.affected_operations.clone(),
            revision_reason: draft.revision_reason.clone(),
            change_reason: draft.change_reason.clone(),
            availability: draft.availability.clone(),
            attachment_path: draft.attachment_path.clone(),
            created_by: existing.created_by.clone(),
            created_at: existing.created_at,
            updated_at: now,
        };

        request::update(&mut tx, &updated).await?;
        approval::delete_for_request(&mut tx, id).await?;
        approval::seed(&mut tx, id, &approvers).await?;
        tx.commit().await.map_err(storage)?;

        info!(
            event_name = "workflow.request_edited",
            request_id = %id.0,
            approver_count = approvers.len(),
            "change request edited; ledger replaced and status reset"
        );
        self.audit.emit(
            AuditEvent::new(
                Some(id.clone()),
                id.0.clone(),
                "request.edited",
                AuditCategory::Request,
                actor.0.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("approvers", approvers.len().to_string()),
        );

        self.notify_seeded(&updated, &approvers);
        Ok(updated)
    }

    /// Delete a rejected request and, via cascade, its ledger.
    pub async fn delete_request(
        &self,
        id: &RequestId,
        actor: ActorId,
    ) -> Result<(), WorkflowError> {
        let mut tx = self.begin().await?;
        let existing = request::find_by_id(&mut tx, id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("no request with id {}", id.0)))?;
        if let Err(error) = ensure_deletable(&existing) {
            self.audit.emit(AuditEvent::new(
                Some(id.clone()),
                id.0.clone(),
                "request.delete_rejected",
                AuditCategory::Request,
                actor.0.clone(),
                AuditOutcome::Rejected,
            ));
            return Err(error);
        }

        request::delete(&mut tx, id).await?;
        tx.commit().await.map_err(storage)?;

        info!(event_name = "workflow.request_deleted", request_id = %id.0, "change request deleted");
        self.audit.emit(AuditEvent::new(
            Some(id.clone()),
            id.0.clone(),
            "request.deleted",
            AuditCategory::Request,
            actor.0.clone(),
            AuditOutcome::Success,
        ));
        Ok(())
    }

    /// Record one approver's decision and recompute the request status in
    /// the same transaction.
    ///
    /// The decision UPDATE is the first statement of the transaction, so
    /// the write lock is held before anything is read and the subsequent
    /// ledger read observes this write plus every previously committed
    /// decision. Two approvers deciding concurrently serialize on that
    /// lock; both decisions persist and the later recomputation sees both.
    pub async fn record_decision(
        &self,
        id: &RequestId,
        approver_id: &ApproverId,
        decision: Decision,
        comment: &str,
    ) -> Result<DecisionOutcome, WorkflowError> {
        validate_decision(decision, comment)?;

        let now = Utc::now();
        let mut tx = self.begin().await?;

        let applied =
            approval::apply_decision(&mut tx, id, approver_id, decision, comment, now).await?;
        if !applied {
            // Nothing was written; the dropped transaction rolls back.
            // Distinguish the not-found cases for the caller.
            if request::find_by_id(&mut tx, id).await?.is_none() {
                return Err(WorkflowError::NotFound(format!("no request with id {}", id.0)));
            }
            return Err(match approval::find_entry(&mut tx, id, approver_id).await? {
                Some(entry) => WorkflowError::NotFound(format!(
                    "approver {} already decided ({}) on request {}",
                    approver_id.0,
                    entry.decision.as_str(),
                    id.0
                )),
                None => WorkflowError::NotFound(format!(
                    "approver {} is not part of request {}",
                    approver_id.0, id.0
                )),
            });
        }

        let entries = approval::list_for(&mut tx, id).await?;
        let status = derive_status(&entries);
        request::set_status(&mut tx, id, status, now).await?;
        tx.commit().await.map_err(storage)?;

        let entry = entries
            .into_iter()
            .find(|entry| &entry.approver_id == approver_id)
            .ok_or_else(|| {
                WorkflowError::Storage("decided entry missing from committed ledger".to_string())
            })?;

        info!(
            event_name = "workflow.decision_recorded",
            request_id = %id.0,
            approver_id = %approver_id.0,
            decision = decision.as_str(),
            status = status.as_str(),
            "approval decision recorded"
        );
        self.audit.emit(
            AuditEvent::new(
                Some(id.clone()),
                id.0.clone(),
                "approval.decision_recorded",
                AuditCategory::Approval,
                approver_id.0.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("decision", decision.as_str())
            .with_metadata("status", status.as_str()),
        );

        Ok(DecisionOutcome { entry, status })
    }

    pub async fn get_request(
        &self,
        id: &RequestId,
    ) -> Result<(ChangeRequest, Vec<ApprovalEntry>), WorkflowError> {
        let mut conn = self.pool.acquire().await.map_err(storage)?;
        let request = request::find_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("no request with id {}", id.0)))?;
        let entries = approval::list_for(&mut conn, id).await?;
        Ok((request, entries))
    }

    pub async fn list_requests(&self) -> Result<Vec<ChangeRequest>, WorkflowError> {
        let mut conn = self.pool.acquire().await.map_err(storage)?;
        Ok(request::list_all(&mut conn).await?)
    }

    /// Requests waiting on one approver, paired with their pending entries.
    pub async fn pending_approvals(
        &self,
        approver_id: &ApproverId,
    ) -> Result<Vec<(ChangeRequest, ApprovalEntry)>, WorkflowError> {
        let mut conn = self.pool.acquire().await.map_err(storage)?;
        let entries = approval::pending_for_approver(&mut conn, approver_id).await?;

        let mut waiting = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(request) = request::find_by_id(&mut conn, &entry.request_id).await? {
                waiting.push((request, entry));
            }
        }
        Ok(waiting)
    }

    pub async fn list_areas(&self) -> Result<Vec<AffectedArea>, WorkflowError> {
        self.load_areas().await
    }

    async fn load_areas(&self) -> Result<Vec<AffectedArea>, WorkflowError> {
        Ok(self.areas.list().await?)
    }

    async fn begin(&self) -> Result<sqlx::Transaction<'_, sqlx::Sqlite>, WorkflowError> {
        self.pool.begin().await.map_err(storage)
    }

    fn notify_seeded(&self, request: &ChangeRequest, approvers: &[ApproverRef]) {
        let summary = RequestSummary::of(request);
        dispatch(
            self.sender.clone(),
            Notification::Created {
                request: summary.clone(),
                recipients: vec![request.created_by.0.clone()],
            },
        );
        for approver in approvers {
            dispatch(
                self.sender.clone(),
                Notification::ApprovalRequested {
                    request: summary.clone(),
                    approver: approver.clone(),
                },
            );
        }
    }
}

fn ensure_area_exists(areas: &[AffectedArea], draft: &RequestDraft) -> Result<(), WorkflowError> {
    if let Some(area_id) = &draft.affected_area_id {
        if !areas.iter().any(|area| &area.id == area_id) {
            return Err(WorkflowError::NotFound(format!("no affected area with id {}", area_id.0)));
        }
    }
    Ok(())
}

fn storage(error: sqlx::Error) -> WorkflowError {
    WorkflowError::Storage(error.to_string())
}
