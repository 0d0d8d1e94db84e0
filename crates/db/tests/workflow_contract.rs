//! End-to-end contract of the approval workflow, exercised through the
//! public `WorkflowService` API against an in-memory database.

use std::sync::Arc;

use chrono::NaiveDate;

use picflow_core::approvers::{can_remove, resolve_mandatory};
use picflow_core::audit::InMemoryAuditSink;
use picflow_core::domain::approval::Decision;
use picflow_core::domain::area::{ActorId, AffectedArea, ApproverId, ApproverRef, AreaId};
use picflow_core::domain::request::{Availability, ChangeReason, RequestDraft, RequestStatus};
use picflow_core::errors::WorkflowError;
use picflow_db::repositories::{AreaRepository, SqlAreaRepository};
use picflow_db::{connect_with_settings, migrations, WorkflowService};
use picflow_notify::InMemorySender;

async fn service_with_areas() -> (WorkflowService, Vec<AffectedArea>) {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");

    let configured = vec![
        AffectedArea {
            id: AreaId("area-a".to_string()),
            name: "Assembly".to_string(),
            mandatory_approvers: vec![
                ApproverRef::new("e1", "Employee e1"),
                ApproverRef::new("e2", "Employee e2"),
            ],
        },
        AffectedArea {
            id: AreaId("area-b".to_string()),
            name: "Test".to_string(),
            mandatory_approvers: vec![ApproverRef::new("e4", "Employee e4")],
        },
    ];

    let repo = SqlAreaRepository::new(pool.clone());
    for area in &configured {
        repo.save(area.clone()).await.expect("save area");
    }

    let service = WorkflowService::new(
        pool,
        Arc::new(InMemorySender::default()),
        Arc::new(InMemoryAuditSink::default()),
    );
    (service, configured)
}

fn draft(area: Option<&str>, approvers: &[&str]) -> RequestDraft {
    RequestDraft {
        affected_area_id: area.map(|id| AreaId(id.to_string())),
        platform: "Line 3".to_string(),
        affected_part_numbers: "PN-1001".to_string(),
        part_numbers_text: None,
        temporary: false,
        temporary_type: None,
        origination_date: NaiveDate::from_ymd_opt(2026, 3, 1).expect("valid date"),
        implementation_date: NaiveDate::from_ymd_opt(2026, 4, 1).expect("valid date"),
        affected_operations: "OP-20".to_string(),
        revision_reason: "Reduce solder bridging".to_string(),
        change_reason: ChangeReason { quality: true, ..ChangeReason::default() },
        availability: Availability::default(),
        attachment_path: None,
        approvers: approvers
            .iter()
            .map(|id| ApproverRef::new(*id, format!("Employee {id}")))
            .collect(),
    }
}

#[tokio::test]
async fn mandatory_approvers_seed_the_ledger_and_cannot_be_removed() {
    let (service, areas) = service_with_areas().await;
    let area_a = AreaId("area-a".to_string());

    let request = service
        .create_request(draft(Some("area-a"), &[]), ActorId("emp-1".to_string()))
        .await
        .expect("create");

    let (_, entries) = service.get_request(&request.id).await.expect("get");
    let ids: Vec<&str> = entries.iter().map(|entry| entry.approver_id.0.as_str()).collect();
    assert_eq!(ids, vec!["e1", "e2"]);

    for mandatory in resolve_mandatory(&areas, Some(&area_a)) {
        assert!(!can_remove(&areas, Some(&area_a), &mandatory.approver_id));
    }
    assert!(can_remove(&areas, Some(&area_a), &ApproverId("e9".to_string())));
}

#[tokio::test]
async fn one_rejection_decides_the_request_for_good() {
    let (service, _) = service_with_areas().await;
    let request = service
        .create_request(draft(Some("area-a"), &[]), ActorId("emp-1".to_string()))
        .await
        .expect("create");

    let outcome = service
        .record_decision(&request.id, &ApproverId("e2".to_string()), Decision::Rejected, "no")
        .await
        .expect("rejection");
    assert_eq!(outcome.status, RequestStatus::Rejected);

    let outcome = service
        .record_decision(&request.id, &ApproverId("e1".to_string()), Decision::Approved, "ok")
        .await
        .expect("late approval");
    assert_eq!(outcome.status, RequestStatus::Rejected);
}

#[tokio::test]
async fn approval_lands_only_after_every_vote_is_in() {
    let (service, _) = service_with_areas().await;
    let request = service
        .create_request(draft(Some("area-a"), &[]), ActorId("emp-1".to_string()))
        .await
        .expect("create");

    let first = service
        .record_decision(&request.id, &ApproverId("e1".to_string()), Decision::Approved, "ok")
        .await
        .expect("first vote");
    assert_eq!(first.status, RequestStatus::Pending);

    let second = service
        .record_decision(&request.id, &ApproverId("e2".to_string()), Decision::Approved, "ok")
        .await
        .expect("second vote");
    assert_eq!(second.status, RequestStatus::Approved);
}

#[tokio::test]
async fn empty_comment_fails_validation() {
    let (service, _) = service_with_areas().await;
    let request = service
        .create_request(draft(Some("area-a"), &[]), ActorId("emp-1".to_string()))
        .await
        .expect("create");

    let error = service
        .record_decision(&request.id, &ApproverId("e1".to_string()), Decision::Approved, "")
        .await
        .expect_err("empty comment must fail");
    assert!(matches!(error, WorkflowError::Validation(_)));
}

#[tokio::test]
async fn approved_requests_refuse_edits() {
    let (service, _) = service_with_areas().await;
    let request = service
        .create_request(draft(Some("area-b"), &[]), ActorId("emp-1".to_string()))
        .await
        .expect("create");
    service
        .record_decision(&request.id, &ApproverId("e4".to_string()), Decision::Approved, "ok")
        .await
        .expect("approve");

    let error = service
        .edit_request(
            &request.id,
            draft(Some("area-b"), &["e4"]),
            ActorId("emp-1".to_string()),
        )
        .await
        .expect_err("approved request must not be editable");
    assert!(matches!(error, WorkflowError::Permission(_)));
}

#[tokio::test]
async fn area_change_on_edit_swaps_mandatory_approvers() {
    let (service, _) = service_with_areas().await;

    // Area A mandates [e1, e2]; author also picked e3.
    let request = service
        .create_request(draft(Some("area-a"), &["e3"]), ActorId("emp-1".to_string()))
        .await
        .expect("create");
    service
        .record_decision(&request.id, &ApproverId("e1".to_string()), Decision::Rejected, "no")
        .await
        .expect("reject");

    // After switching to area B the reconciled list is [e3, e4]; the edit
    // submits it, the ledger is rebuilt from scratch, status resets.
    let edited = service
        .edit_request(
            &request.id,
            draft(Some("area-b"), &["e3", "e4"]),
            ActorId("emp-1".to_string()),
        )
        .await
        .expect("edit");
    assert_eq!(edited.status, RequestStatus::Pending);

    let (_, entries) = service.get_request(&request.id).await.expect("get");
    let ids: Vec<&str> = entries.iter().map(|entry| entry.approver_id.0.as_str()).collect();
    assert_eq!(ids, vec!["e3", "e4"]);
    assert!(entries.iter().all(|entry| entry.decision == Decision::Pending));
}
