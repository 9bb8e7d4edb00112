use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::{ConfiguredServer, RejectedServer, ServerSpec, Settings};
use crate::errors::ManagerError;
use crate::snapshot::{RetentionPlan, RetentionPolicy, SnapshotBackend, SnapshotId, SnapshotRecord};
use crate::status_log::{RunOutcome, RunStatus, StatusLogWriter};

/// Per-server progress through one snapshot cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Pending,
    Created,
    Listed,
    Retained,
    Logged,
    Failed,
}

impl RunState {
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Pending, Created)
                | (Created, Listed)
                | (Listed, Retained)
                | (Retained, Logged)
                | (Pending | Created | Listed | Retained, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Logged | RunState::Failed)
    }
}

/// Step that made a server's cycle fail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FailureStep {
    Configuration { reason: String },
    Create { reason: String },
    /// The snapshot exists remotely but could not be listed afterwards
    OrphanedSnapshot { snapshot: String, reason: String },
    Retention { reason: String },
    Delete { failed: Vec<SnapshotId>, reason: String },
}

impl FailureStep {
    pub fn step(&self) -> &'static str {
        match self {
            FailureStep::Configuration { .. } => "config",
            FailureStep::Create { .. } => "create",
            FailureStep::OrphanedSnapshot { .. } => "list",
            FailureStep::Retention { .. } => "retain",
            FailureStep::Delete { .. } => "delete",
        }
    }
}

impl fmt::Display for FailureStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStep::Configuration { reason } => write!(f, "configuration rejected: {}", reason),
            FailureStep::Create { reason } => write!(f, "snapshot creation failed: {}", reason),
            FailureStep::OrphanedSnapshot { snapshot, reason } => write!(
                f,
                "snapshot {} orphaned, listing after creation failed: {}",
                snapshot, reason
            ),
            FailureStep::Retention { reason } => write!(f, "retention failed: {}", reason),
            FailureStep::Delete { failed, reason } => write!(
                f,
                "{} deletion(s) failed, last error: {}",
                failed.len(),
                reason
            ),
        }
    }
}

/// Everything the coordinator learned about one server
#[derive(Debug, Clone, Serialize)]
pub struct ServerReport {
    pub server_name: String,
    pub state: RunState,
    pub outcome: RunOutcome,
    pub failure: Option<FailureStep>,
    pub created: Option<SnapshotRecord>,
    pub plan: Option<RetentionPlan>,
    pub deleted: Vec<SnapshotId>,
}

impl ServerReport {
    pub fn is_success(&self) -> bool {
        self.outcome.status.is_success()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BatchStatus {
    AllSucceeded,
    PartialFailure,
    TotalFailure,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub reports: Vec<ServerReport>,
}

impl BatchReport {
    pub fn outcomes(&self) -> impl Iterator<Item = &RunOutcome> {
        self.reports.iter().map(|r| &r.outcome)
    }

    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.len() - self.succeeded()
    }

    pub fn overall(&self) -> BatchStatus {
        match (self.succeeded(), self.failed()) {
            (_, 0) => BatchStatus::AllSucceeded,
            (0, _) => BatchStatus::TotalFailure,
            _ => BatchStatus::PartialFailure,
        }
    }
}

/// Tracks one server through the state machine, refusing illegal moves
struct ServerRun<'a> {
    server_name: &'a str,
    state: RunState,
}

impl<'a> ServerRun<'a> {
    fn new(server_name: &'a str) -> Self {
        Self {
            server_name,
            state: RunState::Pending,
        }
    }

    fn advance(&mut self, next: RunState) {
        if self.state.can_transition_to(next) {
            debug!("Server '{}': {:?} -> {:?}", self.server_name, self.state, next);
            self.state = next;
        } else {
            error!(
                "Server '{}': refusing transition {:?} -> {:?}",
                self.server_name, self.state, next
            );
        }
    }
}

/// Runs the snapshot cycle for every configured server, one at a time.
///
/// A server's failure never stops the batch. The only error that escapes is a
/// status log write failure, since outcomes could no longer be recorded.
pub struct SnapshotRunCoordinator {
    backend: Arc<dyn SnapshotBackend>,
    settings: Arc<Settings>,
    hostname: String,
}

impl SnapshotRunCoordinator {
    pub fn new(backend: Arc<dyn SnapshotBackend>, settings: Arc<Settings>, hostname: String) -> Self {
        Self {
            backend,
            settings,
            hostname,
        }
    }

    pub async fn run_batch(
        &self,
        servers: &[ConfiguredServer],
        writer: &mut StatusLogWriter,
    ) -> Result<BatchReport, ManagerError> {
        let pause = Duration::from_secs(self.settings.delay_between_servers_seconds);
        let mut batch = BatchReport::default();

        info!("Starting snapshot run for {} servers", servers.len());

        for (index, server) in servers.iter().enumerate() {
            let mut report = match server {
                ConfiguredServer::Ready(spec) => self.run_server(spec).await,
                ConfiguredServer::Rejected(rejected) => self.rejected_report(rejected),
            };

            writer.append(&report.outcome).await?;
            if !report.state.is_terminal() {
                debug!("Server '{}': {:?} -> {:?}", report.server_name, report.state, RunState::Logged);
                report.state = RunState::Logged;
            }
            batch.reports.push(report);

            if index + 1 < servers.len() && !pause.is_zero() {
                debug!("Waiting {}s before next server", pause.as_secs());
                tokio::time::sleep(pause).await;
            }
        }

        info!(
            "Snapshot run finished: {} succeeded, {} failed, outcomes appended to {}",
            batch.succeeded(),
            batch.failed(),
            writer.path().display()
        );
        Ok(batch)
    }

    /// One full cycle for a single server. Never fails; failures are folded
    /// into the returned report.
    ///
    /// A successful cycle ends in `Retained`; `run_batch` moves it to `Logged`
    /// once the outcome line is appended.
    pub async fn run_server(&self, server: &ServerSpec) -> ServerReport {
        let mut run = ServerRun::new(&server.name);

        let policy = match RetentionPolicy::new(server.retain_last_snapshots) {
            Ok(policy) => policy,
            Err(e) => {
                error!("Server '{}': {}", server.name, e);
                run.advance(RunState::Failed);
                return self.failed_report(
                    run,
                    FailureStep::Retention {
                        reason: e.to_string(),
                    },
                    None,
                    0,
                );
            }
        };

        info!("Server '{}': creating snapshot", server.name);

        let created = match self.backend.create(server).await {
            Ok(created) => created,
            Err(e) => {
                error!("Server '{}': snapshot creation failed: {}", server.name, e);
                run.advance(RunState::Failed);
                return self.failed_report(
                    run,
                    FailureStep::Create {
                        reason: e.to_string(),
                    },
                    None,
                    0,
                );
            }
        };
        run.advance(RunState::Created);
        info!("Server '{}': created snapshot {} ({})", server.name, created.name, created.id);

        let inventory = match self.backend.list(server).await {
            Ok(inventory) => inventory,
            Err(e) => {
                error!(
                    "Server '{}': ORPHANED SNAPSHOT {} ({}), listing failed: {}",
                    server.name, created.name, created.id, e
                );
                run.advance(RunState::Failed);
                let failure = FailureStep::OrphanedSnapshot {
                    snapshot: created.name.clone(),
                    reason: e.to_string(),
                };
                let mut report = self.failed_report(run, failure, Some(&created.name), 0);
                report.created = Some(created);
                return report;
            }
        };
        run.advance(RunState::Listed);
        debug!("Server '{}': {} snapshots listed", server.name, inventory.len());

        let plan = policy.plan(&inventory);
        let plan = if plan.delete.iter().any(|s| s.id == created.id) {
            warn!(
                "Server '{}': new snapshot {} sorted among the oldest, keeping it anyway",
                server.name, created.id
            );
            policy.plan_protecting(&inventory, Some(&created.id))
        } else {
            plan
        };
        run.advance(RunState::Retained);

        if plan.is_empty() {
            info!(
                "Server '{}': {} snapshots within retention of {}, nothing to delete",
                server.name,
                inventory.len(),
                policy.retain()
            );
        } else {
            info!(
                "Server '{}': deleting {} snapshots beyond retention of {}: {:?}",
                server.name,
                plan.delete.len(),
                policy.retain(),
                plan.delete_names()
            );
        }

        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        let mut last_error = None;
        for snapshot in &plan.delete {
            match self.backend.delete(server, &snapshot.id).await {
                Ok(()) => {
                    info!("Server '{}': deleted snapshot {} ({})", server.name, snapshot.name, snapshot.id);
                    deleted.push(snapshot.id.clone());
                }
                Err(e) => {
                    error!(
                        "Server '{}': failed to delete snapshot {} ({}): {}",
                        server.name, snapshot.name, snapshot.id, e
                    );
                    failed.push(snapshot.id.clone());
                    last_error = Some(e.to_string());
                }
            }
        }

        let total = match self.backend.list(server).await {
            Ok(remaining) => remaining.len(),
            Err(e) => {
                warn!(
                    "Server '{}': final listing failed, reporting pre-deletion count: {}",
                    server.name, e
                );
                inventory.len()
            }
        };

        let failure = last_error.map(|reason| FailureStep::Delete { failed, reason });
        let status = if failure.is_some() {
            run.advance(RunState::Failed);
            RunStatus::Failure
        } else {
            RunStatus::Success
        };

        info!(
            "Server '{}': {} with {} snapshots remaining",
            server.name, status, total
        );

        ServerReport {
            server_name: server.name.clone(),
            state: run.state,
            outcome: self.outcome(&server.name, status, Some(&created.name), total),
            failure,
            created: Some(created),
            plan: Some(plan),
            deleted,
        }
    }

    fn rejected_report(&self, rejected: &RejectedServer) -> ServerReport {
        error!(
            "Server '{}': skipped, configuration rejected: {}",
            rejected.name, rejected.error
        );
        let mut run = ServerRun::new(&rejected.name);
        run.advance(RunState::Failed);
        self.failed_report(
            run,
            FailureStep::Configuration {
                reason: rejected.error.to_string(),
            },
            None,
            0,
        )
    }

    fn failed_report(
        &self,
        run: ServerRun<'_>,
        failure: FailureStep,
        snapshot_name: Option<&str>,
        total: usize,
    ) -> ServerReport {
        ServerReport {
            server_name: run.server_name.to_string(),
            state: run.state,
            outcome: self.outcome(run.server_name, RunStatus::Failure, snapshot_name, total),
            failure: Some(failure),
            created: None,
            plan: None,
            deleted: Vec::new(),
        }
    }

    fn outcome(
        &self,
        server_name: &str,
        status: RunStatus,
        snapshot_name: Option<&str>,
        total: usize,
    ) -> RunOutcome {
        RunOutcome::new(
            &self.settings.script_name,
            server_name,
            status,
            &self.hostname,
            Utc::now(),
            snapshot_name,
            total,
        )
    }
}
