use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Serialize;
use tracing::info;

use super::telegram::transport_error;
use super::{NotificationMessage, Notifier};
use crate::constants::timeouts::NOTIFY_REQUEST_TIMEOUT;
use crate::errors::NotifyError;
use crate::status_log::{RunOutcome, RunStatus};

#[derive(Debug, Clone, Copy, Serialize)]
pub enum WebhookSeverity {
    Info,
    Critical,
}

impl From<RunStatus> for WebhookSeverity {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Success => WebhookSeverity::Info,
            RunStatus::Failure => WebhookSeverity::Critical,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload<'a> {
    pub timestamp: DateTime<Utc>,
    pub alert_type: &'static str,
    pub severity: WebhookSeverity,
    pub server_name: &'a str,
    pub server_host: &'a str,
    pub message: &'a str,
    pub details: &'a RunOutcome,
}

impl<'a> WebhookPayload<'a> {
    pub fn from_message(message: &'a NotificationMessage) -> Self {
        Self {
            timestamp: message.outcome.timestamp,
            alert_type: "Snapshot",
            severity: message.outcome.status.into(),
            server_name: &message.outcome.server_name,
            server_host: &message.outcome.hostname,
            message: &message.text,
            details: &message.outcome,
        }
    }
}

/// Generic JSON webhook transport
pub struct WebhookNotifier {
    client: Client,
    url: Url,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Result<Self, NotifyError> {
        let url = Url::parse(url).map_err(|e| NotifyError::NotConfigured {
            reason: format!("invalid webhook_url: {}", e),
        })?;
        let client = Client::builder()
            .timeout(NOTIFY_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::NotConfigured {
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        let target = self.target();
        let payload = WebhookPayload::from_message(message);

        let response = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| transport_error(&target, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                target,
                status: status.as_u16(),
                body,
            });
        }

        info!(
            "Webhook alert sent for '{}': {:?}",
            payload.server_name, payload.severity
        );
        Ok(())
    }

    fn target(&self) -> String {
        format!("webhook {}", self.url.host_str().unwrap_or("unknown"))
    }
}
