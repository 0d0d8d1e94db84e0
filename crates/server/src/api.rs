//! JSON API for change requests and approvals.
//!
//! Endpoints:
//! - `POST   /api/pics`                      — create a request
//! - `GET    /api/pics`                      — list requests, newest first
//! - `GET    /api/pics/{id}`                 — fetch one request with its ledger
//! - `PATCH  /api/pics/{id}`                 — edit a rejected request
//! - `DELETE /api/pics/{id}`                 — delete a rejected request
//! - `PATCH  /api/pics/{id}/approve`         — record an approver decision
//! - `GET    /api/pics/pending-approvals`    — requests waiting on one approver
//! - `GET    /api/areas`                     — affected-area configuration

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use picflow_core::domain::approval::{ApprovalEntry, Decision};
use picflow_core::domain::area::{ActorId, AffectedArea, ApproverId, ApproverRef, AreaId};
use picflow_core::domain::request::{
    Availability, ChangeReason, ChangeRequest, RequestDraft, RequestId, RequestStatus,
};
use picflow_core::errors::WorkflowError;
use picflow_db::WorkflowService;

#[derive(Clone)]
pub struct ApiState {
    service: Arc<WorkflowService>,
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ApproverPayload {
    pub approver_id: String,
    pub display_name: String,
}

impl From<ApproverPayload> for ApproverRef {
    fn from(payload: ApproverPayload) -> Self {
        ApproverRef::new(payload.approver_id, payload.display_name)
    }
}

#[derive(Debug, Deserialize)]
pub struct PicPayload {
    pub affected_area_id: Option<String>,
    pub platform: String,
    pub affected_part_numbers: String,
    pub part_numbers_text: Option<String>,
    #[serde(default)]
    pub temporary: bool,
    pub temporary_type: Option<String>,
    pub origination_date: NaiveDate,
    pub implementation_date: NaiveDate,
    pub affected_operations: String,
    pub revision_reason: String,
    #[serde(default)]
    pub change_reason: ChangeReason,
    #[serde(default)]
    pub availability: Availability,
    pub attachment_path: Option<String>,
    #[serde(default)]
    pub approvers: Vec<ApproverPayload>,
    /// Identity of the acting user, as issued by the identity provider.
    pub actor_id: String,
}

impl PicPayload {
    fn split(self) -> (RequestDraft, ActorId) {
        let actor = ActorId(self.actor_id);
        let draft = RequestDraft {
            affected_area_id: self.affected_area_id.map(AreaId),
            platform: self.platform,
            affected_part_numbers: self.affected_part_numbers,
            part_numbers_text: self.part_numbers_text,
            temporary: self.temporary,
            temporary_type: self.temporary_type,
            origination_date: self.origination_date,
            implementation_date: self.implementation_date,
            affected_operations: self.affected_operations,
            revision_reason: self.revision_reason,
            change_reason: self.change_reason,
            availability: self.availability,
            attachment_path: self.attachment_path,
            approvers: self.approvers.into_iter().map(ApproverRef::from).collect(),
        };
        (draft, actor)
    }
}

#[derive(Debug, Deserialize)]
pub struct DecisionPayload {
    pub approver_id: String,
    /// `approved` or `rejected`; validated once, here at the boundary.
    pub decision: String,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct ActorQuery {
    pub actor_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    pub approver_id: String,
}

#[derive(Debug, Serialize)]
pub struct PicResponse {
    pub request: ChangeRequest,
    pub approvals: Vec<ApprovalEntry>,
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub entry: ApprovalEntry,
    pub status: RequestStatus,
}

#[derive(Debug, Serialize)]
pub struct PendingApprovalResponse {
    pub request: ChangeRequest,
    pub entry: ApprovalEntry,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub class: &'static str,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

fn reject(error: WorkflowError) -> (StatusCode, Json<ApiError>) {
    let status = match &error {
        WorkflowError::Validation(_)
        | WorkflowError::DuplicateApprover { .. }
        | WorkflowError::MandatoryApprover { .. } => StatusCode::BAD_REQUEST,
        WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
        WorkflowError::Permission(_) => StatusCode::FORBIDDEN,
        WorkflowError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiError { error: error.to_string(), class: error.class() }))
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(service: Arc<WorkflowService>) -> Router {
    Router::new()
        .route("/api/pics", post(create_pic).get(list_pics))
        .route("/api/pics/pending-approvals", get(pending_approvals))
        .route("/api/pics/{id}", get(get_pic).patch(edit_pic).delete(delete_pic))
        .route("/api/pics/{id}/approve", patch(approve_pic))
        .route("/api/areas", get(list_areas))
        .with_state(ApiState { service })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn create_pic(
    State(state): State<ApiState>,
    Json(payload): Json<PicPayload>,
) -> ApiResult<(StatusCode, Json<PicResponse>)> {
    let (draft, actor) = payload.split();
    let request = state.service.create_request(draft, actor).await.map_err(reject)?;
    let (request, approvals) = state.service.get_request(&request.id).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(PicResponse { request, approvals })))
}

async fn list_pics(State(state): State<ApiState>) -> ApiResult<Json<Vec<ChangeRequest>>> {
    let requests = state.service.list_requests().await.map_err(reject)?;
    Ok(Json(requests))
}

async fn get_pic(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PicResponse>> {
    let (request, approvals) =
        state.service.get_request(&RequestId(id)).await.map_err(reject)?;
    Ok(Json(PicResponse { request, approvals }))
}

async fn edit_pic(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(payload): Json<PicPayload>,
) -> ApiResult<Json<PicResponse>> {
    let (draft, actor) = payload.split();
    let id = RequestId(id);
    state.service.edit_request(&id, draft, actor).await.map_err(reject)?;
    let (request, approvals) = state.service.get_request(&id).await.map_err(reject)?;
    Ok(Json(PicResponse { request, approvals }))
}

async fn delete_pic(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<StatusCode> {
    state
        .service
        .delete_request(&RequestId(id), ActorId(query.actor_id))
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn approve_pic(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(payload): Json<DecisionPayload>,
) -> ApiResult<Json<DecisionResponse>> {
    let decision = Decision::parse(&payload.decision).map_err(reject)?;
    let outcome = state
        .service
        .record_decision(
            &RequestId(id),
            &ApproverId(payload.approver_id),
            decision,
            &payload.comment,
        )
        .await
        .map_err(reject)?;
    Ok(Json(DecisionResponse { entry: outcome.entry, status: outcome.status }))
}

async fn pending_approvals(
    State(state): State<ApiState>,
    Query(query): Query<PendingQuery>,
) -> ApiResult<Json<Vec<PendingApprovalResponse>>> {
    let waiting = state
        .service
        .pending_approvals(&ApproverId(query.approver_id))
        .await
        .map_err(reject)?;
    Ok(Json(
        waiting
            .into_iter()
            .map(|(request, entry)| PendingApprovalResponse { request, entry })
            .collect(),
    ))
}

async fn list_areas(State(state): State<ApiState>) -> ApiResult<Json<Vec<AffectedArea>>> {
    let areas = state.service.list_areas().await.map_err(reject)?;
    Ok(Json(areas))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    use picflow_core::audit::InMemoryAuditSink;
    use picflow_core::domain::area::{AffectedArea, ApproverRef, AreaId};
    use picflow_db::repositories::{AreaRepository, SqlAreaRepository};
    use picflow_db::{connect_with_settings, migrations, WorkflowService};
    use picflow_notify::InMemorySender;

    async fn router() -> axum::Router {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let areas = SqlAreaRepository::new(pool.clone());
        areas
            .save(AffectedArea {
                id: AreaId("area-a".to_string()),
                name: "Assembly".to_string(),
                mandatory_approvers: vec![ApproverRef::new("e1", "Employee e1")],
            })
            .await
            .expect("seed area");

        let service = Arc::new(WorkflowService::new(
            pool,
            Arc::new(InMemorySender::default()),
            Arc::new(InMemoryAuditSink::default()),
        ));
        super::router(service)
    }

    fn pic_body(approvers: &[&str]) -> Value {
        json!({
            "affected_area_id": "area-a",
            "platform": "Line 3",
            "affected_part_numbers": "PN-1001",
            "origination_date": "2026-03-01",
            "implementation_date": "2026-04-01",
            "affected_operations": "OP-20",
            "revision_reason": "Reduce solder bridging",
            "approvers": approvers
                .iter()
                .map(|id| json!({"approver_id": id, "display_name": format!("Employee {id}")}))
                .collect::<Vec<_>>(),
            "actor_id": "emp-1",
        })
    }

    async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.expect("request");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn patch_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("PATCH")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn create_returns_created_with_seeded_ledger() {
        let router = router().await;
        let (status, body) = send(&router, post_json("/api/pics", &pic_body(&["e3"]))).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["request"]["status"], "pending");
        let approvers: Vec<&str> = body["approvals"]
            .as_array()
            .expect("approvals array")
            .iter()
            .map(|entry| entry["approver_id"].as_str().expect("approver id"))
            .collect();
        assert_eq!(approvers, vec!["e3", "e1"]);
    }

    #[tokio::test]
    async fn decision_flow_maps_statuses_and_errors() {
        let router = router().await;
        let (_, created) = send(&router, post_json("/api/pics", &pic_body(&[]))).await;
        let id = created["request"]["id"].as_str().expect("id").to_string();

        // Non-canonical decision value is rejected at the boundary.
        let (status, body) = send(
            &router,
            patch_json(
                &format!("/api/pics/{id}/approve"),
                &json!({"approver_id": "e1", "decision": "Approved", "comment": "ok"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["class"], "validation");

        // Empty comment is a validation failure.
        let (status, _) = send(
            &router,
            patch_json(
                &format!("/api/pics/{id}/approve"),
                &json!({"approver_id": "e1", "decision": "approved", "comment": ""}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // A valid decision lands and the sole approver approves the request.
        let (status, body) = send(
            &router,
            patch_json(
                &format!("/api/pics/{id}/approve"),
                &json!({"approver_id": "e1", "decision": "approved", "comment": "ok"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "approved");

        // Re-deciding is a 404: no pending entry remains for the approver.
        let (status, body) = send(
            &router,
            patch_json(
                &format!("/api/pics/{id}/approve"),
                &json!({"approver_id": "e1", "decision": "rejected", "comment": "no"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["class"], "not_found");
    }

    #[tokio::test]
    async fn edit_of_non_rejected_request_is_forbidden() {
        let router = router().await;
        let (_, created) = send(&router, post_json("/api/pics", &pic_body(&[]))).await;
        let id = created["request"]["id"].as_str().expect("id").to_string();

        let (status, body) =
            send(&router, patch_json(&format!("/api/pics/{id}"), &pic_body(&["e1"]))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["class"], "permission");
    }

    #[tokio::test]
    async fn delete_requires_rejected_status_and_then_succeeds() {
        let router = router().await;
        let (_, created) = send(&router, post_json("/api/pics", &pic_body(&[]))).await;
        let id = created["request"]["id"].as_str().expect("id").to_string();

        let delete = |uri: String| {
            Request::builder().method("DELETE").uri(uri).body(Body::empty()).expect("request")
        };

        let (status, _) =
            send(&router, delete(format!("/api/pics/{id}?actor_id=emp-1"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        send(
            &router,
            patch_json(
                &format!("/api/pics/{id}/approve"),
                &json!({"approver_id": "e1", "decision": "rejected", "comment": "no"}),
            ),
        )
        .await;

        let (status, _) =
            send(&router, delete(format!("/api/pics/{id}?actor_id=emp-1"))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(
            &router,
            Request::builder()
                .method("GET")
                .uri(format!("/api/pics/{id}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn pending_approvals_and_areas_are_queryable() {
        let router = router().await;
        send(&router, post_json("/api/pics", &pic_body(&[]))).await;

        let (status, body) = send(
            &router,
            Request::builder()
                .method("GET")
                .uri("/api/pics/pending-approvals?approver_id=e1")
                .body(Body::empty())
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().expect("array").len(), 1);

        let (status, body) = send(
            &router,
            Request::builder()
                .method("GET")
                .uri("/api/areas")
                .body(Body::empty())
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "Assembly");
    }
}
