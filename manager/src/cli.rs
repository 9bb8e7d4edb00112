use chrono::{DateTime, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::constants::{defaults, status_log::TIMESTAMP_FORMAT};

#[derive(Debug, Parser)]
#[command(name = "snapshot-manager", version, about = "Scheduled cloud server snapshots with retention and notifications")]
pub struct Cli {
    /// Directory holding main.toml, secrets.toml and the server files
    #[arg(long, global = true, default_value = defaults::CONFIG_DIR)]
    pub config_dir: PathBuf,

    /// Debug-level diagnostic output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Snapshot every configured server, apply retention and write status lines
    Run {
        /// Server files to process (name or path, `.toml` optional); all when empty
        configs: Vec<String>,
    },

    /// Send status lines from the log to the configured notifier
    Notify {
        /// Seconds between consecutive messages
        #[arg(long)]
        delay: Option<u64>,

        /// Only outcomes at or after this time (`YYYY-MM-DD HH:MM:SS` UTC or RFC 3339)
        #[arg(long, value_parser = parse_since)]
        since: Option<DateTime<Utc>>,

        /// Only the newest K outcomes
        #[arg(long)]
        last: Option<usize>,
    },
}

pub fn parse_since(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| format!("expected '{}' or RFC 3339, got '{}'", TIMESTAMP_FORMAT, value))
}
