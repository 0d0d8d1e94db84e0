//! Outbound notifications for workflow state changes.
//!
//! The workflow core treats notification delivery as strictly
//! fire-and-forget: sends are spawned after the triggering transaction
//! commits, failures are logged and swallowed, and nothing ever awaits
//! delivery before reporting success to the caller.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use picflow_core::domain::area::ApproverRef;
use picflow_core::domain::request::{ChangeRequest, RequestStatus};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification transport failure: {0}")]
    Transport(String),
    #[error("notification endpoint rejected the message: HTTP {0}")]
    Endpoint(u16),
}

/// Condensed view of a request carried in notification payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequestSummary {
    pub request_id: String,
    pub platform: String,
    pub revision_reason: String,
    pub status: RequestStatus,
    pub created_by: String,
}

impl RequestSummary {
    pub fn of(request: &ChangeRequest) -> Self {
        Self {
            request_id: request.id.0.clone(),
            platform: request.platform.clone(),
            revision_reason: request.revision_reason.clone(),
            status: request.status,
            created_by: request.created_by.0.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Sent to the author (and any other configured recipients) when a
    /// request enters the workflow.
    Created { request: RequestSummary, recipients: Vec<String> },
    /// Sent to one approver when their review is requested.
    ApprovalRequested { request: RequestSummary, approver: ApproverRef },
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Default when no webhook is configured: deliveries vanish silently.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSender;

#[async_trait]
impl NotificationSender for NoopSender {
    async fn send(&self, _notification: Notification) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Test double that records everything it is asked to send.
#[derive(Clone, Default)]
pub struct InMemorySender {
    sent: Arc<Mutex<Vec<Notification>>>,
    fail: Arc<Mutex<bool>>,
}

impl InMemorySender {
    pub fn sent(&self) -> Vec<Notification> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Make every subsequent send fail, for exercising the
    /// failures-never-propagate contract.
    pub fn fail_all(&self) {
        match self.fail.lock() {
            Ok(mut fail) => *fail = true,
            Err(poisoned) => *poisoned.into_inner() = true,
        }
    }

    fn should_fail(&self) -> bool {
        match self.fail.lock() {
            Ok(fail) => *fail,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl NotificationSender for InMemorySender {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        if self.should_fail() {
            return Err(NotifyError::Transport("simulated failure".to_string()));
        }
        match self.sent.lock() {
            Ok(mut sent) => sent.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
        Ok(())
    }
}

/// POSTs each notification as JSON to a configured webhook endpoint, with
/// an optional bearer token.
pub struct WebhookSender {
    client: reqwest::Client,
    url: String,
    token: Option<SecretString>,
}

impl WebhookSender {
    pub fn new(
        url: impl Into<String>,
        token: Option<SecretString>,
        timeout_secs: u64,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self { client, url: url.into(), token })
    }
}

#[async_trait]
impl NotificationSender for WebhookSender {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        let mut request = self.client.post(&self.url).json(&notification);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response =
            request.send().await.map_err(|e| NotifyError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(NotifyError::Endpoint(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Spawn a send on the runtime and move on. Failures are logged with the
/// request id and never reach the caller.
pub fn dispatch(sender: Arc<dyn NotificationSender>, notification: Notification) {
    let request_id = match &notification {
        Notification::Created { request, .. } => request.request_id.clone(),
        Notification::ApprovalRequested { request, .. } => request.request_id.clone(),
    };

    tokio::spawn(async move {
        if let Err(error) = sender.send(notification).await {
            warn!(
                event_name = "notify.delivery_failed",
                request_id = %request_id,
                error = %error,
                "notification delivery failed; workflow state is unaffected"
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, Utc};

    use picflow_core::domain::area::{ActorId, ApproverRef};
    use picflow_core::domain::request::{
        Availability, ChangeReason, ChangeRequest, RequestId, RequestStatus,
    };

    use super::{
        dispatch, InMemorySender, NoopSender, Notification, NotificationSender, RequestSummary,
    };

    fn request() -> ChangeRequest {
        let now = Utc::now();
        ChangeRequest {
            id: RequestId("pic-1".to_string()),
            affected_area_id: None,
            status: RequestStatus::Pending,
            platform: "Line 3".to_string(),
            affected_part_numbers: "PN-1001".to_string(),
            part_numbers_text: None,
            temporary: false,
            temporary_type: None,
            origination_date: NaiveDate::from_ymd_opt(2026, 3, 1).expect("valid date"),
            implementation_date: NaiveDate::from_ymd_opt(2026, 4, 1).expect("valid date"),
            affected_operations: "OP-20".to_string(),
            revision_reason: "tooling change".to_string(),
            change_reason: ChangeReason::default(),
            availability: Availability::default(),
            attachment_path: None,
            created_by: ActorId("emp-1".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn in_memory_sender_records_notifications() {
        let sender = InMemorySender::default();
        sender
            .send(Notification::ApprovalRequested {
                request: RequestSummary::of(&request()),
                approver: ApproverRef::new("e1", "Employee e1"),
            })
            .await
            .expect("send");

        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert!(matches!(sent[0], Notification::ApprovalRequested { .. }));
    }

    #[tokio::test]
    async fn noop_sender_always_succeeds() {
        NoopSender
            .send(Notification::Created {
                request: RequestSummary::of(&request()),
                recipients: vec!["emp-1".to_string()],
            })
            .await
            .expect("noop send");
    }

    #[tokio::test]
    async fn dispatch_swallows_sender_failures() {
        let sender = InMemorySender::default();
        sender.fail_all();

        dispatch(
            Arc::new(sender.clone()),
            Notification::Created {
                request: RequestSummary::of(&request()),
                recipients: vec!["emp-1".to_string()],
            },
        );

        // Let the spawned task run; the failure must not panic or surface.
        tokio::task::yield_now().await;
        assert!(sender.sent().is_empty());
    }
}
