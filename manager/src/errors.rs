//! Error types for the snapshot manager
//!
//! Per-unit failures (one server, one message, one log line) are converted into
//! outcome records by their callers. Only configuration-wide and log I/O
//! failures travel up to `main`.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the snapshot manager
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Status log error: {0}")]
    Log(#[from] LogError),
}

/// Configuration error variants
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to load config from '{path}': {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Failed to parse config: {reason}")]
    ParseError { reason: String },

    #[error("Retention count must be at least 1 (got {count})")]
    InvalidRetention { count: i64 },
}

/// Snapshot backend error variants
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The provider command exited with a failure status
    #[error("Command '{command}' failed: {reason}")]
    CommandFailed { command: String, reason: String },

    /// The provider command could not be started at all
    #[error("Failed to spawn '{command}': {reason}")]
    SpawnFailed { command: String, reason: String },

    #[error("Timeout after {seconds}s while {operation}")]
    Timeout { operation: String, seconds: u64 },

    #[error("Invalid response while {operation}: {reason}")]
    InvalidResponse { operation: String, reason: String },

    #[error("Snapshot {snapshot_id} not found for server {server_id}")]
    NotFound {
        server_id: String,
        snapshot_id: String,
    },
}

/// Structured status log error variants
#[derive(Debug, Error)]
pub enum LogError {
    #[error("Failed to open status log {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to append to status log {}: {source}", path.display())]
    Append {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read status log {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Status log {} does not exist", path.display())]
    Missing { path: PathBuf },
}

/// Per-line status log parse failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line does not carry the {tag} tag")]
    UnknownTag { tag: &'static str },

    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("empty {field} field")]
    EmptyField { field: &'static str },

    #[error("unknown status '{value}'")]
    InvalidStatus { value: String },

    #[error("invalid timestamp '{value}'")]
    InvalidTimestamp { value: String },

    #[error("invalid snapshot total '{value}'")]
    InvalidTotal { value: String },

    #[error("line is not valid UTF-8 (invalid byte at offset {offset})")]
    InvalidEncoding { offset: usize },
}

/// Notification delivery error variants
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("Notifier is not configured: {reason}")]
    NotConfigured { reason: String },

    #[error("Request to {target} failed: {reason}")]
    Transport { target: String, reason: String },

    #[error("{target} rejected the message with status {status}: {body}")]
    Rejected {
        target: String,
        status: u16,
        body: String,
    },

    #[error("Request to {target} timed out after {seconds}s")]
    Timeout { target: String, seconds: u64 },
}
