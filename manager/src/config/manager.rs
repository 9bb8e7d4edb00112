use super::{
    ApiToken, NotifierConfig, RawServerConfig, SecretsLoader, ServerConfigFile, ServerSpec,
    Settings,
};
use crate::errors::ConfigError;
use anyhow::{anyhow, Result};
use glob::glob;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

const MAIN_CONFIG_FILE: &str = "main.toml";
const SECRETS_FILE: &str = "secrets.toml";

/// A server file that could not be turned into a [`ServerSpec`]. The batch
/// still reports it as a failed server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedServer {
    pub name: String,
    pub source: PathBuf,
    pub error: ConfigError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfiguredServer {
    Ready(ServerSpec),
    Rejected(RejectedServer),
}

impl ConfiguredServer {
    pub fn name(&self) -> &str {
        match self {
            ConfiguredServer::Ready(spec) => &spec.name,
            ConfiguredServer::Rejected(rejected) => &rejected.name,
        }
    }
}

pub struct ConfigManager {
    settings: Arc<Settings>,
    servers: Vec<ConfiguredServer>,
}

impl ConfigManager {
    /// Load main settings and every server file in `config_dir`
    pub async fn new(config_dir: impl AsRef<Path>) -> Result<Self> {
        Self::load(config_dir, &[]).await
    }

    /// Load main settings and the selected server files. An empty selection
    /// means every `*.toml` in the directory except main and secrets.
    pub async fn load(config_dir: impl AsRef<Path>, selection: &[String]) -> Result<Self> {
        let config_dir = config_dir.as_ref();
        let (settings, secrets) = Self::load_global(config_dir).await?;

        let paths = if selection.is_empty() {
            Self::discover_server_files(config_dir)?
        } else {
            selection
                .iter()
                .map(|name| resolve_selected(config_dir, name))
                .collect()
        };

        if paths.is_empty() {
            return Err(anyhow!(
                "No server configuration files found in {}",
                config_dir.display()
            ));
        }

        let mut servers = Vec::with_capacity(paths.len());
        for path in paths {
            let server = Self::load_server(&path, &secrets).await;
            if let ConfiguredServer::Rejected(rejected) = &server {
                warn!(
                    "Server config {} rejected: {}",
                    rejected.source.display(),
                    rejected.error
                );
            }
            servers.push(server);
        }

        let ready = servers
            .iter()
            .filter(|s| matches!(s, ConfiguredServer::Ready(_)))
            .count();
        info!(
            "Loaded {} server configs ({} ready, {} rejected)",
            servers.len(),
            ready,
            servers.len() - ready
        );

        Ok(Self {
            settings: Arc::new(settings),
            servers,
        })
    }

    /// Global settings only, with secrets and environment overrides applied.
    /// Used by commands that do not touch servers.
    pub async fn load_settings_only(config_dir: impl AsRef<Path>) -> Result<Settings> {
        let (settings, _) = Self::load_global(config_dir.as_ref()).await?;
        Ok(settings)
    }

    async fn load_global(config_dir: &Path) -> Result<(Settings, SecretsLoader)> {
        let mut settings = Self::load_settings(config_dir).await?;

        let secrets = SecretsLoader::load(&config_dir.join(SECRETS_FILE))?;
        secrets.fill_notifier(&mut settings.notifier);
        apply_env_overrides(&mut settings.notifier, |key| std::env::var(key).ok());

        Ok((settings, secrets))
    }

    pub fn settings(&self) -> Arc<Settings> {
        self.settings.clone()
    }

    pub fn servers(&self) -> &[ConfiguredServer] {
        &self.servers
    }

    async fn load_settings(config_dir: &Path) -> Result<Settings> {
        let main_config_path = config_dir.join(MAIN_CONFIG_FILE);
        if !main_config_path.exists() {
            warn!(
                "{} not found, using default settings",
                main_config_path.display()
            );
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&main_config_path)
            .await
            .map_err(|e| anyhow!("Failed to read main config {}: {}", main_config_path.display(), e))?;

        let settings: Settings = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse main config: {}", e))?;

        debug!("Loaded settings from {}", main_config_path.display());
        Ok(settings)
    }

    fn discover_server_files(config_dir: &Path) -> Result<Vec<PathBuf>> {
        let pattern = format!("{}/*.toml", config_dir.display());
        let mut paths = Vec::new();

        for entry in glob(&pattern).map_err(|e| anyhow!("Glob pattern error: {}", e))? {
            let path = entry.map_err(|e| anyhow!("Glob entry error: {}", e))?;
            let filename = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow!("Invalid filename"))?;

            if filename == MAIN_CONFIG_FILE || filename == SECRETS_FILE {
                continue;
            }
            paths.push(path);
        }

        paths.sort();
        Ok(paths)
    }

    async fn load_server(path: &Path, secrets: &SecretsLoader) -> ConfiguredServer {
        let fallback_name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("unknown")
            .to_string();

        let reject = |name: String, error: ConfigError| {
            ConfiguredServer::Rejected(RejectedServer {
                name,
                source: path.to_path_buf(),
                error,
            })
        };

        debug!("Loading server config: {}", path.display());

        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                return reject(
                    fallback_name,
                    ConfigError::LoadFailed {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    },
                )
            }
        };

        let file: ServerConfigFile = match toml::from_str(&content) {
            Ok(file) => file,
            Err(e) => {
                return reject(
                    fallback_name,
                    ConfigError::ParseError {
                        reason: format!("{}: {}", path.display(), e),
                    },
                )
            }
        };

        let Some(raw) = file.server else {
            return reject(
                fallback_name,
                ConfigError::MissingRequired {
                    field: "server".to_string(),
                },
            );
        };

        let name = raw.name.clone().unwrap_or(fallback_name);
        match validate_server(raw, secrets) {
            Ok(spec) => ConfiguredServer::Ready(spec),
            Err(error) => reject(name, error),
        }
    }
}

/// Turn a raw `[server]` table into a `ServerSpec`, naming the first problem found
pub fn validate_server(
    raw: RawServerConfig,
    secrets: &SecretsLoader,
) -> Result<ServerSpec, ConfigError> {
    let missing = |field: &str| ConfigError::MissingRequired {
        field: field.to_string(),
    };

    let id = raw.id.ok_or_else(|| missing("id"))?.to_string();
    if id.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "id".to_string(),
            reason: "must not be empty".to_string(),
        });
    }

    let name = raw.name.ok_or_else(|| missing("name"))?;
    if name.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "name".to_string(),
            reason: "must not be empty".to_string(),
        });
    }

    let api_token = match (raw.api_token, raw.api_token_ref) {
        (Some(token), _) => ApiToken::new(token),
        (None, Some(reference)) => secrets
            .get_server_api_token(&reference)
            .map(ApiToken::new)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "api_token_ref".to_string(),
                reason: format!("no secret named '{}'", reference),
            })?,
        (None, None) => return Err(missing("api_token")),
    };

    let retain = raw
        .retain_last_snapshots
        .ok_or_else(|| missing("retain_last_snapshots"))?;
    if retain < 1 {
        return Err(ConfigError::InvalidRetention { count: retain });
    }
    let retain = usize::try_from(retain).map_err(|_| ConfigError::InvalidValue {
        field: "retain_last_snapshots".to_string(),
        reason: format!("{} is out of range", retain),
    })?;

    ServerSpec::new(id, name, api_token, retain)
}

/// Environment variables take precedence over file-provided notifier credentials
pub fn apply_env_overrides<F>(notifier: &mut NotifierConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = lookup("TELEGRAM_BOT_TOKEN").filter(|v| !v.is_empty()) {
        notifier.telegram_bot_token = Some(token);
    }
    if let Some(chat_id) = lookup("TELEGRAM_CHAT_ID").filter(|v| !v.is_empty()) {
        notifier.telegram_chat_id = Some(chat_id);
    }
}

fn resolve_selected(config_dir: &Path, name: &str) -> PathBuf {
    let candidate = Path::new(name);
    let candidate = if candidate.extension().is_some() {
        candidate.to_path_buf()
    } else {
        candidate.with_extension("toml")
    };

    if candidate.is_absolute() {
        candidate
    } else {
        config_dir.join(candidate)
    }
}
