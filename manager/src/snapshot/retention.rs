//! Retention decision for one server's snapshot inventory.
//!
//! Pure and deterministic: the same inventory and count always produce the
//! same split, and nothing here touches the backend.

use serde::Serialize;

use super::types::{sort_oldest_first, SnapshotId, SnapshotRecord};
use crate::errors::ConfigError;

/// Keep the N most recent snapshots of a server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    retain: usize,
}

/// Disjoint split of an inventory. Both halves are ordered oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RetentionPlan {
    pub keep: Vec<SnapshotRecord>,
    pub delete: Vec<SnapshotRecord>,
}

impl RetentionPolicy {
    pub fn new(retain: usize) -> Result<Self, ConfigError> {
        if retain == 0 {
            return Err(ConfigError::InvalidRetention { count: 0 });
        }
        Ok(Self { retain })
    }

    pub fn retain(&self) -> usize {
        self.retain
    }

    /// Split `inventory` into the `retain` newest snapshots and the rest.
    ///
    /// The input is re-sorted by creation time (ties on id), so callers may
    /// pass it in any order.
    pub fn plan(&self, inventory: &[SnapshotRecord]) -> RetentionPlan {
        let mut ordered = inventory.to_vec();
        sort_oldest_first(&mut ordered);

        let cut = ordered.len().saturating_sub(self.retain);
        let keep = ordered.split_off(cut);

        RetentionPlan {
            keep,
            delete: ordered,
        }
    }

    /// Like [`plan`](Self::plan), but never schedules `protected` for deletion.
    ///
    /// When skewed timestamps push the protected snapshot out of the keep set,
    /// it trades places with the oldest kept snapshot, so `keep` keeps its size.
    pub fn plan_protecting(
        &self,
        inventory: &[SnapshotRecord],
        protected: Option<&SnapshotId>,
    ) -> RetentionPlan {
        let mut plan = self.plan(inventory);
        if let Some(protected) = protected {
            plan.protect(protected);
        }
        plan
    }
}

impl RetentionPlan {
    /// Returns true if the plan had to be adjusted
    pub fn protect(&mut self, id: &SnapshotId) -> bool {
        let Some(position) = self.delete.iter().position(|s| &s.id == id) else {
            return false;
        };
        if self.keep.is_empty() {
            return false;
        }

        let rescued = self.delete.remove(position);
        let displaced = self.keep.remove(0);

        self.keep.push(rescued);
        sort_oldest_first(&mut self.keep);
        self.delete.push(displaced);
        sort_oldest_first(&mut self.delete);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.delete.is_empty()
    }

    pub fn delete_names(&self) -> Vec<&str> {
        self.delete.iter().map(|s| s.name.as_str()).collect()
    }
}
