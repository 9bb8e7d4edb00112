//! Common test data

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

use snapshot_manager::config::{ApiToken, ServerSpec, Settings};
use snapshot_manager::snapshot::{SnapshotId, SnapshotRecord};
use snapshot_manager::status_log::{RunOutcome, RunStatus};

pub const SCRIPT: &str = "snapshot-manager";
pub const HOSTNAME: &str = "test-host";

/// Fixed origin plus `seconds`
pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
}

pub fn server(name: &str, id: &str, retain: usize) -> ServerSpec {
    ServerSpec::new(id, name, ApiToken::new(format!("token-{}-abcdefghijkl", name)), retain)
        .unwrap()
}

pub fn snapshot(id: &str, seconds: i64) -> SnapshotRecord {
    SnapshotRecord {
        id: SnapshotId::from(id),
        server_id: "1".to_string(),
        created_at: at(seconds),
        name: format!("snap-{}", id),
    }
}

/// `count` snapshots with ids 1..=count, one second apart, oldest first
pub fn inventory(count: usize) -> Vec<SnapshotRecord> {
    (1..=count)
        .map(|n| snapshot(&n.to_string(), n as i64))
        .collect()
}

pub fn outcome(server_name: &str, status: RunStatus, seconds: i64) -> RunOutcome {
    RunOutcome::new(
        SCRIPT,
        server_name,
        status,
        HOSTNAME,
        at(seconds),
        Some(&format!("{}-snap", server_name)),
        3,
    )
}

/// Settings with every pause disabled
pub fn fast_settings() -> Arc<Settings> {
    let mut settings = Settings::default();
    settings.script_name = SCRIPT.to_string();
    settings.hostname = Some(HOSTNAME.to_string());
    settings.delay_between_servers_seconds = 0;
    settings.dispatch.retry_delay_seconds = 0;
    settings.dispatch.delay_between_messages_seconds = 0;
    Arc::new(settings)
}
