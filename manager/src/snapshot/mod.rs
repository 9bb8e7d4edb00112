//! Cloud snapshot inventory and retention
//!
//! # Key pieces
//!
//! - **Backend**: [`SnapshotBackend`] is the provider capability (create, list, delete).
//!   [`HcloudBackend`] implements it on top of the Hetzner Cloud CLI.
//! - **Retention**: [`RetentionPolicy`] decides which snapshots to keep. It is pure
//!   and runs on in-memory inventories.
//!
//! # Ordering
//!
//! Inventories are ordered oldest first by creation time. Snapshots created in
//! the same second are ordered by backend id, lower first.

pub mod backend;
pub mod hcloud;
pub mod retention;
pub mod types;

pub use backend::SnapshotBackend;
pub use hcloud::HcloudBackend;
pub use retention::{RetentionPlan, RetentionPolicy};
pub use types::{sort_oldest_first, SnapshotId, SnapshotRecord};
