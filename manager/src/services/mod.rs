pub mod notification_dispatcher;
pub mod run_coordinator;

pub use notification_dispatcher::{DispatchReport, NotificationDispatcher};
pub use run_coordinator::{
    BatchReport, BatchStatus, FailureStep, RunState, ServerReport, SnapshotRunCoordinator,
};
