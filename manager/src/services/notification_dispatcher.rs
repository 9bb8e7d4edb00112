use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::DispatchConfig;
use crate::notify::{DeliveryStatus, NotificationMessage, Notifier};
use crate::status_log::RunOutcome;

/// Relays parsed outcomes to a notifier with bounded retry.
///
/// Delivery is at-least-once within one invocation; nothing is remembered
/// between invocations.
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    config: DispatchConfig,
}

#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub messages: Vec<NotificationMessage>,
}

impl DispatchReport {
    pub fn sent(&self) -> impl Iterator<Item = &NotificationMessage> {
        self.messages.iter().filter(|m| m.status.is_sent())
    }

    pub fn failed(&self) -> impl Iterator<Item = &NotificationMessage> {
        self.messages
            .iter()
            .filter(|m| matches!(m.status, DeliveryStatus::Failed { .. }))
    }

    pub fn sent_count(&self) -> usize {
        self.sent().count()
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    pub fn all_sent(&self) -> bool {
        self.messages.iter().all(|m| m.status.is_sent())
    }
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, config: DispatchConfig) -> Self {
        Self { notifier, config }
    }

    pub async fn dispatch(&self, outcomes: Vec<RunOutcome>) -> DispatchReport {
        let messages: Vec<NotificationMessage> =
            outcomes.into_iter().map(NotificationMessage::new).collect();
        let total = messages.len();

        info!(
            "Dispatching {} notifications to {} (max {} attempts, {} in parallel)",
            total,
            self.notifier.target(),
            self.max_attempts(),
            self.config.max_parallel.max(1)
        );

        let messages = if self.config.max_parallel > 1 {
            stream::iter(messages)
                .map(|message| self.deliver(message))
                .buffer_unordered(self.config.max_parallel)
                .collect::<Vec<_>>()
                .await
        } else {
            self.dispatch_sequential(messages).await
        };

        let report = DispatchReport { messages };
        info!(
            "Dispatch finished: {} sent, {} failed",
            report.sent_count(),
            report.failed_count()
        );
        report
    }

    async fn dispatch_sequential(&self, messages: Vec<NotificationMessage>) -> Vec<NotificationMessage> {
        let pause = Duration::from_secs(self.config.delay_between_messages_seconds);
        let total = messages.len();
        let mut delivered = Vec::with_capacity(total);

        for (index, message) in messages.into_iter().enumerate() {
            delivered.push(self.deliver(message).await);

            if index + 1 < total && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }

        delivered
    }

    /// Run one message through its retry sequence until it is terminal
    async fn deliver(&self, mut message: NotificationMessage) -> NotificationMessage {
        let max_attempts = self.max_attempts();
        let server = message.outcome.server_name.clone();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.notifier.send(&message).await {
                Ok(()) => {
                    message.status = DeliveryStatus::Sent { attempts: attempt };
                    return message;
                }
                Err(e) => {
                    warn!(
                        "Server '{}': notification attempt {}/{} failed: {}",
                        server, attempt, max_attempts, e
                    );
                    last_error = e.to_string();

                    if attempt < max_attempts {
                        let backoff = self.config.backoff_after(attempt);
                        if !backoff.is_zero() {
                            tokio::time::sleep(backoff).await;
                        }
                    }
                }
            }
        }

        error!(
            "Server '{}': notification failed after {} attempts",
            server, max_attempts
        );
        message.status = DeliveryStatus::Failed {
            attempts: max_attempts,
            last_error,
        };
        message
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }
}
