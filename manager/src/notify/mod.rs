//! Operator notifications
//!
//! A [`Notifier`] delivers one formatted message and reports failure; retries
//! and pacing belong to the dispatcher.

pub mod message;
pub mod telegram;
pub mod webhook;

use async_trait::async_trait;
use std::sync::Arc;

pub use message::{format_message, DeliveryStatus, NotificationMessage};
pub use telegram::TelegramNotifier;
pub use webhook::WebhookNotifier;

use crate::config::{NotifierConfig, NotifierKind};
use crate::errors::NotifyError;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a single message. Any error counts as one failed attempt.
    async fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError>;

    /// Short label for logs, never containing credentials
    fn target(&self) -> String;
}

/// Build the notifier selected in settings
pub fn build_notifier(config: &NotifierConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    match config.kind {
        NotifierKind::Telegram => {
            let token = config.telegram_bot_token.as_deref().filter(|t| !t.is_empty());
            let chat_id = config.telegram_chat_id.as_deref().filter(|c| !c.is_empty());
            match (token, chat_id) {
                (Some(token), Some(chat_id)) => Ok(Arc::new(TelegramNotifier::new(
                    &config.telegram_api_base,
                    token,
                    chat_id,
                )?)),
                (None, _) => Err(NotifyError::NotConfigured {
                    reason: "telegram_bot_token is not set".to_string(),
                }),
                (_, None) => Err(NotifyError::NotConfigured {
                    reason: "telegram_chat_id is not set".to_string(),
                }),
            }
        }
        NotifierKind::Webhook => match config.webhook_url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => Ok(Arc::new(WebhookNotifier::new(url)?)),
            None => Err(NotifyError::NotConfigured {
                reason: "webhook_url is not set".to_string(),
            }),
        },
    }
}
