use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use picflow_core::audit::{AuditEvent, AuditSink};
use picflow_core::config::{AppConfig, ConfigError, LoadOptions};
use picflow_db::{connect_with_settings, migrations, DbPool, WorkflowService};
use picflow_notify::{NoopSender, NotificationSender, WebhookSender};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: Arc<WorkflowService>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("notification sender initialization failed: {0}")]
    Notify(#[from] picflow_notify::NotifyError),
}

/// Audit sink that forwards workflow audit events into the structured log
/// stream.
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn emit(&self, event: AuditEvent) {
        info!(
            event_name = "audit.event",
            audit_event_type = %event.event_type,
            request_id = event.request_id.as_ref().map(|id| id.0.as_str()).unwrap_or("unknown"),
            correlation_id = %event.correlation_id,
            actor = %event.actor,
            outcome = ?event.outcome,
            "audit event emitted"
        );
    }
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let sender: Arc<dyn NotificationSender> = match &config.notify.webhook_url {
        Some(url) => Arc::new(WebhookSender::new(
            url.clone(),
            config.notify.webhook_token.clone(),
            config.notify.timeout_secs,
        )?),
        None => Arc::new(NoopSender),
    };
    info!(
        event_name = "system.bootstrap.notify_mode",
        correlation_id = "bootstrap",
        mode = if config.notify.webhook_url.is_some() { "webhook" } else { "noop" },
        "notification sender initialized"
    );

    let service = Arc::new(WorkflowService::new(db_pool.clone(), sender, Arc::new(LogAuditSink)));

    Ok(Application { config, db_pool, service })
}
