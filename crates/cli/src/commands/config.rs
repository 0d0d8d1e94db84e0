use picflow_core::config::{AppConfig, LoadOptions};
use serde_json::json;

/// Render the effective configuration as JSON with secrets redacted.
pub fn run() -> String {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            let payload = json!({
                "database": {
                    "url": config.database.url,
                    "max_connections": config.database.max_connections,
                    "timeout_secs": config.database.timeout_secs,
                },
                "server": {
                    "bind_address": config.server.bind_address,
                    "port": config.server.port,
                    "graceful_shutdown_secs": config.server.graceful_shutdown_secs,
                },
                "notify": {
                    "webhook_url": config.notify.webhook_url,
                    "webhook_token": config.notify.webhook_token.as_ref().map(|_| "<redacted>"),
                    "timeout_secs": config.notify.timeout_secs,
                },
                "logging": {
                    "level": config.logging.level,
                    "format": config.logging.format,
                },
            });
            serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|error| format!("{{\"error\":\"{error}\"}}"))
        }
        Err(error) => {
            serde_json::to_string(&json!({
                "command": "config",
                "status": "error",
                "message": format!("configuration issue: {error}"),
            }))
            .unwrap_or_else(|serialize_error| format!("{{\"error\":\"{serialize_error}\"}}"))
        }
    }
}
