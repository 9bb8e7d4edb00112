use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, error, warn};

use crate::constants::defaults;
use crate::errors::BackendError;

#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run `program` with `args` and extra environment, bounded by `timeout`.
///
/// `rendered` is what gets logged and embedded in errors; callers pass a
/// rendering with secrets already masked. The child is killed if the
/// timeout fires.
pub async fn execute_command(
    program: &Path,
    args: &[&str],
    envs: &[(&str, &str)],
    timeout: Duration,
    rendered: &str,
) -> Result<CommandOutput, BackendError> {
    debug!("Executing command: {}", rendered);

    let mut command = AsyncCommand::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in envs {
        command.env(key, value);
    }

    let child = command.spawn().map_err(|e| BackendError::SpawnFailed {
        command: rendered.to_string(),
        reason: e.to_string(),
    })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(BackendError::CommandFailed {
                command: rendered.to_string(),
                reason: e.to_string(),
            })
        }
        Err(_) => {
            error!("Command timed out after {}s: {}", timeout.as_secs(), rendered);
            return Err(BackendError::Timeout {
                operation: format!("running '{}'", rendered),
                seconds: timeout.as_secs(),
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if output.status.success() {
        debug!("Command stdout: {}", stdout);
        if !stderr.is_empty() {
            warn!("Command stderr: {}", stderr);
        }
        Ok(CommandOutput { stdout, stderr })
    } else {
        let reason = if !stderr.is_empty() { stderr } else { stdout };
        error!("Command failed: {}", reason);
        Err(BackendError::CommandFailed {
            command: rendered.to_string(),
            reason,
        })
    }
}

/// Locate an executable: `which` first, then the given fallback locations
pub async fn find_executable(name: &str, fallbacks: &[&str]) -> Option<PathBuf> {
    if let Ok(output) = AsyncCommand::new("which").arg(name).output().await {
        if output.status.success() {
            let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !found.is_empty() && Path::new(&found).exists() {
                debug!("Found {} in PATH: {}", name, found);
                return Some(PathBuf::from(found));
            }
        }
    }

    let home = std::env::var("HOME").ok();
    fallbacks
        .iter()
        .filter_map(|candidate| expand_home(candidate, home.as_deref()))
        .find(|path| path.exists())
        .inspect(|path| debug!("Found {} in common path: {}", name, path.display()))
}

fn expand_home(path: &str, home: Option<&str>) -> Option<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => home.map(|home| Path::new(home).join(rest)),
        None => Some(PathBuf::from(path)),
    }
}

/// Name of the machine running the batch, as printed by `hostname`
pub async fn resolve_hostname() -> String {
    match AsyncCommand::new("hostname").output().await {
        Ok(output) if output.status.success() => {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !name.is_empty() {
                return name;
            }
        }
        Ok(_) | Err(_) => {}
    }

    std::env::var("HOSTNAME")
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| {
            warn!("Could not determine hostname, using '{}'", defaults::UNKNOWN_HOSTNAME);
            defaults::UNKNOWN_HOSTNAME.to_string()
        })
}
