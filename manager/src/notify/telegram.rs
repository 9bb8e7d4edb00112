use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use super::{NotificationMessage, Notifier};
use crate::constants::timeouts::NOTIFY_REQUEST_TIMEOUT;
use crate::errors::NotifyError;

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Telegram Bot API transport (`sendMessage`)
pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, bot_token: &str, chat_id: &str) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(NOTIFY_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::NotConfigured {
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                api_base.trim_end_matches('/'),
                bot_token
            ),
            chat_id: chat_id.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        let target = self.target();
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text: &message.text,
            parse_mode: "Markdown",
        };

        debug!("Sending notification for '{}' to {}", message.outcome.server_name, target);

        // The endpoint embeds the bot token, keep it out of error text
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
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

        info!("Notification sent for '{}' to {}", message.outcome.server_name, target);
        Ok(())
    }

    fn target(&self) -> String {
        format!("telegram chat {}", self.chat_id)
    }
}

pub(crate) fn transport_error(target: &str, error: reqwest::Error) -> NotifyError {
    if error.is_timeout() {
        NotifyError::Timeout {
            target: target.to_string(),
            seconds: NOTIFY_REQUEST_TIMEOUT.as_secs(),
        }
    } else {
        NotifyError::Transport {
            target: target.to_string(),
            reason: error.without_url().to_string(),
        }
    }
}
