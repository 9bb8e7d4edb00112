use serde::Serialize;

use crate::constants::status_log::{TAG, TIMESTAMP_FORMAT, TOTAL_SUFFIX};
use crate::status_log::RunOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sent { attempts: u32 },
    Failed { attempts: u32, last_error: String },
}

impl DeliveryStatus {
    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryStatus::Sent { .. })
    }
}

/// One outcome rendered for operators, plus where its delivery stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationMessage {
    pub outcome: RunOutcome,
    pub text: String,
    pub status: DeliveryStatus,
}

impl NotificationMessage {
    pub fn new(outcome: RunOutcome) -> Self {
        let text = format_message(&outcome);
        Self {
            outcome,
            text,
            status: DeliveryStatus::Pending,
        }
    }
}

/// Markdown body sent to chat transports
pub fn format_message(outcome: &RunOutcome) -> String {
    format!(
        "*{}*\n\
         *Script:* `{}`\n\
         *Server:* `{}`\n\
         *Status:* `{}`\n\
         *Hostname:* `{}`\n\
         *Timestamp:* `{}`\n\
         *Snapshot:* `{}`\n\
         *Total Snapshots:* `{}{}`",
        TAG,
        code_span(&outcome.script),
        code_span(&outcome.server_name),
        outcome.status,
        code_span(&outcome.hostname),
        outcome.timestamp.format(TIMESTAMP_FORMAT),
        code_span(outcome.snapshot_name.as_deref().unwrap_or("none")),
        outcome.total_snapshots,
        TOTAL_SUFFIX
    )
}

// Markdown code spans cannot escape a backtick
fn code_span(value: &str) -> String {
    value.replace('`', "'")
}
