//! In-memory snapshot backend
//!
//! Keeps one inventory per server id, hands out increasing ids and creation
//! times, and fails on demand so the coordinator's error paths can be driven
//! without a provider.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use snapshot_manager::config::ServerSpec;
use snapshot_manager::errors::BackendError;
use snapshot_manager::snapshot::{sort_oldest_first, SnapshotBackend, SnapshotId, SnapshotRecord};

use super::test_data::at;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Create(String),
    List(String),
    Delete(String, SnapshotId),
}

struct FakeState {
    inventories: HashMap<String, Vec<SnapshotRecord>>,
    next_id: u64,
    clock: DateTime<Utc>,
    failing_creates: HashSet<String>,
    /// server name -> index of the first failing list call
    failing_lists: HashMap<String, usize>,
    list_calls: HashMap<String, usize>,
    failing_deletes: HashSet<SnapshotId>,
    /// Created snapshots get this timestamp instead of the running clock
    skewed_created_at: Option<DateTime<Utc>>,
    calls: Vec<BackendCall>,
}

pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                inventories: HashMap::new(),
                next_id: 1000,
                clock: at(10 * 24 * 3600),
                failing_creates: HashSet::new(),
                failing_lists: HashMap::new(),
                list_calls: HashMap::new(),
                failing_deletes: HashSet::new(),
                skewed_created_at: None,
                calls: Vec::new(),
            }),
        }
    }

    /// Seed `count` existing snapshots for `server`, one day apart, ids 1..=count
    pub fn with_snapshots(self, server: &ServerSpec, count: u64) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let inventory = state.inventories.entry(server.id.clone()).or_default();
            for n in 1..=count {
                inventory.push(SnapshotRecord {
                    id: SnapshotId::from(n),
                    server_id: server.id.clone(),
                    created_at: at(n as i64 * 24 * 3600),
                    name: format!("{}-seed-{}", server.name, n),
                });
            }
        }
        self
    }

    pub fn fail_create(self, server_name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_creates
            .insert(server_name.to_string());
        self
    }

    /// Every list call for the server fails
    pub fn fail_list(self, server_name: &str) -> Self {
        self.fail_list_from(server_name, 0)
    }

    /// List calls for the server fail starting with the `nth` (0-based)
    pub fn fail_list_from(self, server_name: &str, nth: usize) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_lists
            .insert(server_name.to_string(), nth);
        self
    }

    pub fn fail_delete(self, id: impl Into<SnapshotId>) -> Self {
        self.state.lock().unwrap().failing_deletes.insert(id.into());
        self
    }

    /// Stamp new snapshots with `created_at`, simulating provider clock skew
    pub fn skew_created_at(self, created_at: DateTime<Utc>) -> Self {
        self.state.lock().unwrap().skewed_created_at = Some(created_at);
        self
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn deleted_ids(&self) -> Vec<SnapshotId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::Delete(_, id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn inventory(&self, server_id: &str) -> Vec<SnapshotRecord> {
        let mut inventory = self
            .state
            .lock()
            .unwrap()
            .inventories
            .get(server_id)
            .cloned()
            .unwrap_or_default();
        sort_oldest_first(&mut inventory);
        inventory
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotBackend for FakeBackend {
    async fn create(&self, server: &ServerSpec) -> Result<SnapshotRecord, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(BackendCall::Create(server.name.clone()));

        if state.failing_creates.contains(&server.name) {
            return Err(BackendError::CommandFailed {
                command: "create-image".to_string(),
                reason: "injected create failure".to_string(),
            });
        }

        let id = state.next_id;
        state.next_id += 1;
        state.clock = state.clock + Duration::hours(1);
        let created_at = state.skewed_created_at.unwrap_or(state.clock);

        let record = SnapshotRecord {
            id: SnapshotId::from(id),
            server_id: server.id.clone(),
            created_at,
            name: format!("{}-{}", server.name, id),
        };
        state
            .inventories
            .entry(server.id.clone())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn list(&self, server: &ServerSpec) -> Result<Vec<SnapshotRecord>, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(BackendCall::List(server.name.clone()));

        let call_index = {
            let counter = state.list_calls.entry(server.name.clone()).or_insert(0);
            let index = *counter;
            *counter += 1;
            index
        };
        if let Some(first_failing) = state.failing_lists.get(&server.name) {
            if call_index >= *first_failing {
                return Err(BackendError::Timeout {
                    operation: "listing snapshots".to_string(),
                    seconds: 120,
                });
            }
        }

        let mut inventory = state
            .inventories
            .get(&server.id)
            .cloned()
            .unwrap_or_default();
        sort_oldest_first(&mut inventory);
        Ok(inventory)
    }

    async fn delete(&self, server: &ServerSpec, snapshot_id: &SnapshotId) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(BackendCall::Delete(server.name.clone(), snapshot_id.clone()));

        if state.failing_deletes.contains(snapshot_id) {
            return Err(BackendError::CommandFailed {
                command: format!("image delete {}", snapshot_id),
                reason: "injected delete failure".to_string(),
            });
        }

        let inventory = state.inventories.entry(server.id.clone()).or_default();
        let before = inventory.len();
        inventory.retain(|s| &s.id != snapshot_id);
        if inventory.len() == before {
            return Err(BackendError::NotFound {
                server_id: server.id.clone(),
                snapshot_id: snapshot_id.to_string(),
            });
        }
        Ok(())
    }
}
