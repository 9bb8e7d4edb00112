pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod errors;
pub mod notify;
pub mod services;
pub mod snapshot;
pub mod status_log;

// Re-export commonly used types
pub use config::{ConfigManager, ConfiguredServer, ServerSpec, Settings};
pub use errors::{BackendError, ConfigError, LogError, ManagerError, NotifyError, ParseError};
pub use notify::{build_notifier, Notifier};
pub use services::{NotificationDispatcher, SnapshotRunCoordinator};
pub use snapshot::{HcloudBackend, RetentionPolicy, SnapshotBackend};
pub use status_log::{RunOutcome, RunStatus, StatusLogWriter};
