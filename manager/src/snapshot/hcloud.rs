use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use super::backend::SnapshotBackend;
use super::types::{sort_oldest_first, SnapshotId, SnapshotRecord};
use crate::commands::{execute_command, find_executable};
use crate::config::{ServerSpec, Settings};
use crate::constants::{defaults, status_log};
use crate::errors::BackendError;

const STATUS_AVAILABLE: &str = "available";

#[derive(Debug, Clone, Deserialize)]
struct HcloudImage {
    id: u64,
    description: Option<String>,
    created: String,
    status: Option<String>,
    created_from: Option<HcloudCreatedFrom>,
}

#[derive(Debug, Clone, Deserialize)]
struct HcloudCreatedFrom {
    id: u64,
}

/// Snapshot backend driving the Hetzner Cloud `hcloud` CLI.
///
/// The server's token reaches the child only through `HCLOUD_TOKEN`.
#[derive(Debug, Clone)]
pub struct HcloudBackend {
    binary: PathBuf,
    command_timeout: Duration,
    ready_timeout: Duration,
    poll_interval: Duration,
}

impl HcloudBackend {
    pub fn new(binary: impl Into<PathBuf>, settings: &Settings) -> Self {
        Self {
            binary: binary.into(),
            command_timeout: Duration::from_secs(settings.command_timeout_seconds),
            ready_timeout: Duration::from_secs(settings.snapshot_ready_timeout_seconds),
            poll_interval: Duration::from_secs(settings.snapshot_poll_interval_seconds),
        }
    }

    /// Use the configured binary or look for `hcloud` in PATH and common locations
    pub async fn discover(settings: &Settings) -> Result<Self, BackendError> {
        if let Some(path) = &settings.hcloud_path {
            if !path.exists() {
                return Err(BackendError::SpawnFailed {
                    command: path.display().to_string(),
                    reason: "configured hcloud_path does not exist".to_string(),
                });
            }
            return Ok(Self::new(path.clone(), settings));
        }

        match find_executable("hcloud", defaults::HCLOUD_SEARCH_PATHS).await {
            Some(path) => {
                info!("Using hcloud CLI at {}", path.display());
                Ok(Self::new(path, settings))
            }
            None => Err(BackendError::SpawnFailed {
                command: "hcloud".to_string(),
                reason: "not found in PATH or common installation locations".to_string(),
            }),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    async fn run(&self, server: &ServerSpec, args: &[&str]) -> Result<String, BackendError> {
        let rendered = format!("{} {}", self.binary.display(), args.join(" "));
        debug!(
            "Server '{}': running hcloud with token {}",
            server.name,
            server.api_token.masked()
        );
        let output = execute_command(
            &self.binary,
            args,
            &[("HCLOUD_TOKEN", server.api_token.expose())],
            self.command_timeout,
            &rendered,
        )
        .await?;
        Ok(output.stdout)
    }

    async fn describe(&self, server: &ServerSpec, id: &str) -> Result<HcloudImage, BackendError> {
        let output = self
            .run(server, &["image", "describe", id, "--output", "json"])
            .await?;
        serde_json::from_str(&output).map_err(|e| BackendError::InvalidResponse {
            operation: format!("describing image {}", id),
            reason: e.to_string(),
        })
    }

    async fn wait_until_available(
        &self,
        server: &ServerSpec,
        id: &str,
    ) -> Result<HcloudImage, BackendError> {
        let deadline = Instant::now() + self.ready_timeout;

        loop {
            match self.describe(server, id).await {
                Ok(image) if image.status.as_deref() == Some(STATUS_AVAILABLE) => {
                    info!("Server '{}': Snapshot {} is now available.", server.name, id);
                    return Ok(image);
                }
                Ok(image) => debug!(
                    "Server '{}': Snapshot {} status: {}",
                    server.name,
                    id,
                    image.status.as_deref().unwrap_or("unknown")
                ),
                Err(e) => warn!(
                    "Server '{}': Could not read status of snapshot {}: {}",
                    server.name, id, e
                ),
            }

            if Instant::now() >= deadline {
                error!(
                    "Server '{}': Snapshot {} did not become available within {} seconds.",
                    server.name,
                    id,
                    self.ready_timeout.as_secs()
                );
                return Err(BackendError::Timeout {
                    operation: format!("waiting for snapshot {} to become available", id),
                    seconds: self.ready_timeout.as_secs(),
                });
            }
            sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl SnapshotBackend for HcloudBackend {
    async fn create(&self, server: &ServerSpec) -> Result<SnapshotRecord, BackendError> {
        let name = snapshot_name(&server.name, Utc::now());
        let output = self
            .run(
                server,
                &[
                    "server",
                    "create-image",
                    "--type",
                    "snapshot",
                    "--description",
                    name.as_str(),
                    server.id.as_str(),
                ],
            )
            .await?;

        let image_id = parse_image_id(&output).ok_or_else(|| BackendError::InvalidResponse {
            operation: "creating snapshot".to_string(),
            reason: format!("no image id in output '{}'", output),
        })?;

        let image = self.wait_until_available(server, &image_id).await?;
        let created_at = parse_created(&image.created).ok_or_else(|| BackendError::InvalidResponse {
            operation: format!("describing image {}", image_id),
            reason: format!("invalid creation timestamp '{}'", image.created),
        })?;

        info!("Server '{}': New snapshot created: {}", server.name, name);
        Ok(SnapshotRecord {
            id: SnapshotId::new(image_id),
            server_id: server.id.clone(),
            created_at,
            name: image.description.unwrap_or(name),
        })
    }

    async fn list(&self, server: &ServerSpec) -> Result<Vec<SnapshotRecord>, BackendError> {
        let output = self
            .run(server, &["image", "list", "--type", "snapshot", "--output", "json"])
            .await?;
        parse_snapshot_list(&output, server)
    }

    async fn delete(
        &self,
        server: &ServerSpec,
        snapshot_id: &SnapshotId,
    ) -> Result<(), BackendError> {
        self.run(server, &["image", "delete", snapshot_id.as_str()])
            .await?;
        Ok(())
    }
}

/// `<server-name>-<YYYYMMDDHHMMSS>`
pub fn snapshot_name(server_name: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}-{}",
        server_name,
        now.format(status_log::SNAPSHOT_NAME_TIMESTAMP_FORMAT)
    )
}

/// Extract the image id from `Image 123456789 created from Server 123456`
pub fn parse_image_id(output: &str) -> Option<String> {
    let tokens: Vec<&str> = output.split_whitespace().collect();
    let is_id = |t: &&str| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit());

    tokens
        .windows(2)
        .find(|pair| pair[0].eq_ignore_ascii_case("image") && is_id(&pair[1]))
        .map(|pair| pair[1].to_string())
        .or_else(|| tokens.iter().copied().find(|t| is_id(t)).map(|t| t.to_string()))
}

fn parse_created(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse `hcloud image list --output json`, keeping the server's own snapshots
pub fn parse_snapshot_list(
    output: &str,
    server: &ServerSpec,
) -> Result<Vec<SnapshotRecord>, BackendError> {
    let images: Vec<HcloudImage> =
        serde_json::from_str(output).map_err(|e| BackendError::InvalidResponse {
            operation: "listing snapshots".to_string(),
            reason: e.to_string(),
        })?;

    let mut snapshots = Vec::new();
    for image in images {
        let owned = image
            .created_from
            .as_ref()
            .is_some_and(|origin| origin.id.to_string() == server.id);
        if !owned {
            continue;
        }

        let name = image
            .description
            .clone()
            .unwrap_or_else(|| image.id.to_string());
        let Some(created_at) = parse_created(&image.created) else {
            error!(
                "Server '{}': Invalid date format for snapshot '{}': {}",
                server.name, name, image.created
            );
            continue;
        };

        debug!(
            "Server '{}': Snapshot found: {} (ID: {}) created at {}",
            server.name, name, image.id, created_at
        );
        snapshots.push(SnapshotRecord {
            id: SnapshotId::from(image.id),
            server_id: server.id.clone(),
            created_at,
            name,
        });
    }

    sort_oldest_first(&mut snapshots);
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiToken;
    use chrono::TimeZone;

    fn server() -> ServerSpec {
        ServerSpec::new("123456", "test-server", ApiToken::new("test-token-123456"), 3).unwrap()
    }

    #[test]
    fn test_parse_image_id() {
        assert_eq!(
            parse_image_id("Image 987654 created from Server 123456"),
            Some("987654".to_string())
        );
        assert_eq!(parse_image_id("created 42"), Some("42".to_string()));
        assert_eq!(parse_image_id("nothing here"), None);
    }

    #[test]
    fn test_snapshot_name_format() {
        let now = Utc.with_ymd_and_hms(2024, 12, 2, 13, 32, 13).unwrap();
        assert_eq!(snapshot_name("example.com", now), "example.com-20241202133213");
    }

    #[test]
    fn test_list_filters_other_servers_and_sorts() {
        let json = r#"[
            {"id": 3, "description": "test-server-3", "created": "2024-01-03T00:00:00Z", "created_from": {"id": 123456}, "status": "available"},
            {"id": 1, "description": "test-server-1", "created": "2024-01-01T00:00:00Z", "created_from": {"id": 123456}, "status": "available"},
            {"id": 7, "description": "other", "created": "2024-01-02T00:00:00Z", "created_from": {"id": 999}, "status": "available"},
            {"id": 8, "description": "orphan", "created": "2024-01-02T00:00:00Z", "created_from": null, "status": "available"},
            {"id": 2, "description": "bad-date", "created": "yesterday", "created_from": {"id": 123456}, "status": "available"}
        ]"#;

        let snapshots = parse_snapshot_list(json, &server()).unwrap();
        let ids: Vec<&str> = snapshots.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(snapshots[0].name, "test-server-1");
    }

    #[test]
    fn test_list_rejects_invalid_json() {
        let result = parse_snapshot_list("invalid json", &server());
        assert!(matches!(result, Err(BackendError::InvalidResponse { .. })));
    }
}
