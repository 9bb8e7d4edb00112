pub mod manager;
pub mod secrets;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub use manager::{ConfigManager, ConfiguredServer, RejectedServer};
pub use secrets::SecretsLoader;

use crate::constants::{defaults, dispatch, timeouts};
use crate::errors::ConfigError;

/// Global settings from `main.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_status_log_path")]
    pub status_log_path: PathBuf,
    #[serde(default = "default_script_name")]
    pub script_name: String,
    /// Overrides the detected hostname in status lines
    pub hostname: Option<String>,
    /// Explicit hcloud binary; discovered when absent
    pub hcloud_path: Option<PathBuf>,
    #[serde(default = "default_command_timeout")]
    pub command_timeout_seconds: u64,
    #[serde(default = "default_ready_timeout")]
    pub snapshot_ready_timeout_seconds: u64,
    #[serde(default = "default_poll_interval")]
    pub snapshot_poll_interval_seconds: u64,
    #[serde(default = "default_server_delay")]
    pub delay_between_servers_seconds: u64,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            status_log_path: default_status_log_path(),
            script_name: default_script_name(),
            hostname: None,
            hcloud_path: None,
            command_timeout_seconds: default_command_timeout(),
            snapshot_ready_timeout_seconds: default_ready_timeout(),
            snapshot_poll_interval_seconds: default_poll_interval(),
            delay_between_servers_seconds: default_server_delay(),
            notifier: NotifierConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

fn default_status_log_path() -> PathBuf {
    PathBuf::from(defaults::STATUS_LOG_PATH)
}

fn default_script_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

fn default_command_timeout() -> u64 {
    timeouts::COMMAND_TIMEOUT_SECONDS
}

fn default_ready_timeout() -> u64 {
    timeouts::SNAPSHOT_READY_TIMEOUT_SECONDS
}

fn default_poll_interval() -> u64 {
    timeouts::SNAPSHOT_POLL_INTERVAL_SECONDS
}

fn default_server_delay() -> u64 {
    defaults::DELAY_BETWEEN_SERVERS_SECONDS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    #[default]
    Telegram,
    Webhook,
}

/// Notifier selection and credentials (flat, env can fill the Telegram pair)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub kind: NotifierKind,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    #[serde(default = "default_telegram_api_base")]
    pub telegram_api_base: String,
    pub webhook_url: Option<String>,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            kind: NotifierKind::default(),
            telegram_bot_token: None,
            telegram_chat_id: None,
            telegram_api_base: default_telegram_api_base(),
            webhook_url: None,
        }
    }
}

fn default_telegram_api_base() -> String {
    dispatch::TELEGRAM_API_BASE.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

/// Retry and pacing policy for the notification dispatcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: u64,
    #[serde(default)]
    pub backoff: BackoffKind,
    #[serde(default = "default_message_delay")]
    pub delay_between_messages_seconds: u64,
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_seconds: default_retry_delay(),
            backoff: BackoffKind::default(),
            delay_between_messages_seconds: default_message_delay(),
            max_parallel: default_max_parallel(),
        }
    }
}

impl DispatchConfig {
    /// Delay to wait after the given failed attempt (1-based)
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let base = Duration::from_secs(self.retry_delay_seconds);
        match self.backoff {
            BackoffKind::Fixed => base,
            BackoffKind::Exponential => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                base.saturating_mul(factor)
            }
        }
    }
}

fn default_max_attempts() -> u32 {
    dispatch::MAX_ATTEMPTS
}

fn default_retry_delay() -> u64 {
    dispatch::RETRY_DELAY_SECONDS
}

fn default_message_delay() -> u64 {
    dispatch::DELAY_BETWEEN_MESSAGES_SECONDS
}

fn default_max_parallel() -> usize {
    dispatch::MAX_PARALLEL
}

/// Provider API token. Debug and Display never print the full value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First and last six characters, or `***` for short tokens
    pub fn masked(&self) -> String {
        mask_secret(&self.0)
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiToken({})", self.masked())
    }
}

impl fmt::Display for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        return "***".to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("{}...{}", head, tail)
}

/// One server managed by a run. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSpec {
    pub id: String,
    pub name: String,
    pub api_token: ApiToken,
    pub retain_last_snapshots: usize,
}

impl ServerSpec {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        api_token: ApiToken,
        retain_last_snapshots: usize,
    ) -> Result<Self, ConfigError> {
        if retain_last_snapshots == 0 {
            return Err(ConfigError::InvalidRetention { count: 0 });
        }
        Ok(Self {
            id: id.into(),
            name: name.into(),
            api_token,
            retain_last_snapshots,
        })
    }
}

/// Raw `[server]` table as written in a server file; every field optional so
/// that missing ones can be reported by name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigFile {
    pub server: Option<RawServerConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawServerConfig {
    pub id: Option<ServerIdValue>,
    pub name: Option<String>,
    pub api_token: Option<String>,
    pub api_token_ref: Option<String>,
    pub retain_last_snapshots: Option<i64>,
}

/// Server ids are numeric at Hetzner but often quoted in configs
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ServerIdValue {
    Text(String),
    Number(i64),
}

impl fmt::Display for ServerIdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerIdValue::Text(s) => f.write_str(s),
            ServerIdValue::Number(n) => write!(f, "{}", n),
        }
    }
}
