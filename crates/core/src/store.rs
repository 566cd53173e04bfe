//! Durable store for already-announced news item identifiers.
//!
//! One deployment-global newline-delimited file shared across all tracked
//! games. The file is read, unioned with new ids, trimmed to the newest
//! suffix, and rewritten wholesale each poll cycle. Single-writer: the
//! poller owns every read-modify-write.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not read id store `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not write id store `{path}`: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

#[derive(Clone, Debug)]
pub struct AnnouncedIdStore {
    path: PathBuf,
}

impl AnnouncedIdStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns persisted ids in file order. A missing file is a cold
    /// start, not an error: empty storage is created and an empty list
    /// returned.
    pub async fn read(&self) -> Result<Vec<String>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let ids: Vec<String> = content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_owned)
                    .collect();
                debug!(count = ids.len(), path = %self.path.display(), "loaded announced ids");
                Ok(ids)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "id store missing, creating empty file");
                self.persist("").await?;
                Ok(Vec::new())
            }
            Err(source) => Err(StoreError::Read { path: self.path.clone(), source }),
        }
    }

    /// Replaces stored content with `ids` truncated to its last
    /// `max_ids` elements, one id per line with a trailing newline.
    pub async fn write(&self, ids: &[String], max_ids: usize) -> Result<(), StoreError> {
        let start = ids.len().saturating_sub(max_ids);
        let trimmed = &ids[start..];

        let mut content = trimmed.join("\n");
        content.push('\n');
        self.persist(&content).await?;

        info!(
            total = ids.len(),
            kept = trimmed.len(),
            path = %self.path.display(),
            "rewrote announced id store"
        );
        Ok(())
    }

    /// Read, append `new_ids`, write back trimmed. This is the operation
    /// the poll cycle calls once per cycle. Not atomic against external
    /// mutation of the same file; there is exactly one writer.
    pub async fn update(&self, new_ids: &[String], max_ids: usize) -> Result<(), StoreError> {
        let mut ids = self.read().await?;
        ids.extend(new_ids.iter().cloned());
        self.write(&ids, max_ids).await
    }

    async fn persist(&self, content: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Write { path: self.path.clone(), source })?;
        }
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|source| StoreError::Write { path: self.path.clone(), source })
    }
}
