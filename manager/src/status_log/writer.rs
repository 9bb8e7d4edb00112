use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::record::RunOutcome;
use crate::errors::LogError;

/// Append-only writer for status lines.
///
/// Each outcome becomes one complete line written in a single call and
/// flushed to disk before `append` returns. The writer never truncates.
pub struct StatusLogWriter {
    path: PathBuf,
    file: File,
}

impl StatusLogWriter {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| LogError::Open {
                    path: path.clone(),
                    source,
                })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| LogError::Open {
                path: path.clone(),
                source,
            })?;

        debug!("Opened status log {}", path.display());
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&mut self, outcome: &RunOutcome) -> Result<(), LogError> {
        let mut line = outcome.to_line();
        line.push('\n');

        let append_error = |source: std::io::Error| LogError::Append {
            path: self.path.clone(),
            source,
        };

        self.file
            .write_all(line.as_bytes())
            .await
            .map_err(append_error)?;
        self.file.flush().await.map_err(append_error)?;
        self.file.sync_data().await.map_err(append_error)?;

        info!("{}", line.trim_end());
        Ok(())
    }
}
