//! Central repository for timeouts, intervals, and default configuration values
//!
//! Constants are grouped by concern so every tunable has a single source of truth.

use std::time::Duration;

/// Timeouts for calls leaving the process
pub mod timeouts {
    use super::Duration;

    /// Upper bound for a single provider CLI invocation
    pub const COMMAND_TIMEOUT_SECONDS: u64 = 120;

    /// How long a freshly created snapshot may take to become available
    pub const SNAPSHOT_READY_TIMEOUT_SECONDS: u64 = 300;

    /// Interval between snapshot status polls
    pub const SNAPSHOT_POLL_INTERVAL_SECONDS: u64 = 10;

    /// Per-request timeout for notifier HTTP calls
    pub const NOTIFY_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
}

/// Notification dispatch defaults
pub mod dispatch {
    /// Attempts per message, first try included
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Base delay between attempts of the same message
    pub const RETRY_DELAY_SECONDS: u64 = 5;

    /// Pause between consecutive messages in sequential mode
    pub const DELAY_BETWEEN_MESSAGES_SECONDS: u64 = 10;

    /// Messages in flight at once
    pub const MAX_PARALLEL: usize = 1;

    /// Default Telegram Bot API base URL
    pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
}

/// Batch run defaults
pub mod defaults {
    /// Pause between servers, skipped after the last one
    pub const DELAY_BETWEEN_SERVERS_SECONDS: u64 = 5;

    /// Default directory holding main.toml and the server files
    pub const CONFIG_DIR: &str = "config";

    /// Default status log location
    pub const STATUS_LOG_PATH: &str = "logs/snapshot-status.log";

    /// Hostname used when it cannot be determined
    pub const UNKNOWN_HOSTNAME: &str = "unknown";

    /// Common install locations probed for the hcloud binary
    pub const HCLOUD_SEARCH_PATHS: &[&str] = &[
        "/usr/local/bin/hcloud",
        "/usr/bin/hcloud",
        "/opt/homebrew/bin/hcloud",
        "~/.local/bin/hcloud",
        "~/bin/hcloud",
    ];
}

/// Structured status log format
pub mod status_log {
    /// Record-type tag leading every status line
    pub const TAG: &str = "FINAL_STATUS";

    /// Field separator, surrounding spaces included
    pub const DELIMITER: &str = " | ";

    /// Number of delimited fields, tag included
    pub const FIELD_COUNT: usize = 8;

    /// chrono format of the timestamp field
    pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// Suffix appended to the snapshot total
    pub const TOTAL_SUFFIX: &str = " snapshots exist";

    /// chrono format used when naming new snapshots
    pub const SNAPSHOT_NAME_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
}

/// Process exit codes
pub mod exit_codes {
    /// Every server or message succeeded
    pub const SUCCESS: u8 = 0;

    /// Configuration, log or startup failure; nothing reliable was produced
    pub const FATAL: u8 = 1;

    /// At least one server or message failed
    pub const PARTIAL_FAILURE: u8 = 2;
}
