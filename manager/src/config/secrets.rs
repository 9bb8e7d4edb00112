//! Secrets loader for provider tokens and notifier credentials.
//!
//! Secrets live in a separate TOML file (config/secrets.toml) kept out of
//! version control. Server files may reference a token by name
//! (`api_token_ref`) instead of embedding it, and this module resolves the
//! reference at load time.
//!
//! Example secrets.toml:
//! ```toml
//! telegram_bot_token = "123456:ABC..."
//! telegram_chat_id = "-100123456"
//!
//! [servers]
//! web = "hcloud-token-1"
//! db = "hcloud-token-2"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use super::NotifierConfig;

/// Structure matching the secrets.toml file format
#[derive(Debug, Deserialize, Default)]
pub struct SecretsFile {
    #[serde(default)]
    pub servers: HashMap<String, String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub webhook_url: Option<String>,
}

/// Loader for secrets from the secrets.toml file
#[derive(Default)]
pub struct SecretsLoader {
    secrets: SecretsFile,
}

impl SecretsLoader {
    /// Load secrets from the specified file path.
    /// Returns an empty loader if the file doesn't exist.
    pub fn load(secrets_path: &Path) -> Result<Self> {
        if !secrets_path.exists() {
            debug!(
                "Secrets file not found at {:?}, tokens must be inline or in the environment",
                secrets_path
            );
            return Ok(Self {
                secrets: SecretsFile::default(),
            });
        }

        let content = std::fs::read_to_string(secrets_path)
            .with_context(|| format!("Failed to read secrets file: {:?}", secrets_path))?;

        let secrets: SecretsFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse secrets file: {:?}", secrets_path))?;

        info!(
            "Loaded secrets for {} servers from {:?}",
            secrets.servers.len(),
            secrets_path
        );

        Ok(Self { secrets })
    }

    /// Get the API token for a server by its reference name.
    pub fn get_server_api_token(&self, api_token_ref: &str) -> Option<&str> {
        self.secrets.servers.get(api_token_ref).map(|s| s.as_str())
    }

    /// Fill notifier credentials that main.toml left empty
    pub fn fill_notifier(&self, notifier: &mut NotifierConfig) {
        if notifier.telegram_bot_token.is_none() {
            notifier.telegram_bot_token = self.secrets.telegram_bot_token.clone();
        }
        if notifier.telegram_chat_id.is_none() {
            notifier.telegram_chat_id = self.secrets.telegram_chat_id.clone();
        }
        if notifier.webhook_url.is_none() {
            notifier.webhook_url = self.secrets.webhook_url.clone();
        }
    }
}
