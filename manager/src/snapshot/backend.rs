use async_trait::async_trait;

use super::types::{SnapshotId, SnapshotRecord};
use crate::config::ServerSpec;
use crate::errors::BackendError;

/// Snapshot capability of a cloud provider for one server at a time.
///
/// Calls mutate remote state and are not transactional: a snapshot may exist
/// remotely even when `create` reports an error.
#[async_trait]
pub trait SnapshotBackend: Send + Sync {
    /// Create a snapshot and return it once the provider reports it usable
    async fn create(&self, server: &ServerSpec) -> Result<SnapshotRecord, BackendError>;

    /// All snapshots of `server`, oldest first
    async fn list(&self, server: &ServerSpec) -> Result<Vec<SnapshotRecord>, BackendError>;

    async fn delete(&self, server: &ServerSpec, snapshot_id: &SnapshotId)
        -> Result<(), BackendError>;
}
