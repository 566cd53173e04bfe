//! Persisted registry of tracked games.
//!
//! Stored as a pretty-printed JSON array of `{name, app_id}` records.
//! Every mutation rewrites the whole file; `app_id` is unique, `name`
//! is display-only.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedGame {
    pub name: String,
    pub app_id: String,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("could not read registry `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not write registry `{path}`: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("could not parse registry `{path}`: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("a game with app id {app_id} is already tracked as \"{existing_name}\"")]
    DuplicateApp { app_id: String, existing_name: String },
    #[error("no tracked game found with app id {app_id}")]
    UnknownApp { app_id: String },
}

#[derive(Clone, Debug)]
pub struct GameRegistry {
    path: PathBuf,
}

impl GameRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All tracked games in insertion order. A missing registry file is
    /// treated as empty and created on first use.
    pub async fn list(&self) -> Result<Vec<TrackedGame>, RegistryError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let games: Vec<TrackedGame> = serde_json::from_str(&content)
                    .map_err(|source| RegistryError::Parse { path: self.path.clone(), source })?;
                debug!(count = games.len(), path = %self.path.display(), "loaded tracked games");
                Ok(games)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "registry missing, creating empty file");
                self.save(&[]).await?;
                Ok(Vec::new())
            }
            Err(source) => Err(RegistryError::Read { path: self.path.clone(), source }),
        }
    }

    /// Adds a game. Fails without touching the file when the app id is
    /// already registered.
    pub async fn add(&self, name: &str, app_id: &str) -> Result<TrackedGame, RegistryError> {
        let mut games = self.list().await?;

        if let Some(existing) = games.iter().find(|game| game.app_id == app_id) {
            return Err(RegistryError::DuplicateApp {
                app_id: app_id.to_owned(),
                existing_name: existing.name.clone(),
            });
        }

        let game = TrackedGame { name: name.to_owned(), app_id: app_id.to_owned() };
        games.push(game.clone());
        self.save(&games).await?;

        info!(name = %game.name, app_id = %game.app_id, "added tracked game");
        Ok(game)
    }

    /// Removes the game with the given app id, returning the removed
    /// record.
    pub async fn remove(&self, app_id: &str) -> Result<TrackedGame, RegistryError> {
        let mut games = self.list().await?;

        let position = games
            .iter()
            .position(|game| game.app_id == app_id)
            .ok_or_else(|| RegistryError::UnknownApp { app_id: app_id.to_owned() })?;

        let removed = games.remove(position);
        self.save(&games).await?;

        info!(name = %removed.name, app_id = %removed.app_id, "removed tracked game");
        Ok(removed)
    }

    async fn save(&self, games: &[TrackedGame]) -> Result<(), RegistryError> {
        let content = serde_json::to_string_pretty(games)
            .map_err(|source| RegistryError::Parse { path: self.path.clone(), source })?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| RegistryError::Write { path: self.path.clone(), source })?;
        }
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|source| RegistryError::Write { path: self.path.clone(), source })
    }
}
