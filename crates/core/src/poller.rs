//! Poll-and-announce orchestration.
//!
//! One cycle: list tracked games, load the announced-id snapshot once,
//! fetch each game's feed sequentially, diff against the snapshot,
//! announce the delta in feed order, persist the new ids once at the
//! end. A fetch or send failure is scoped to its game or item; cycle
//! ordering stays deterministic because nothing runs concurrently.
//!
//! Delivery is best-effort, mark-regardless: an id is persisted as
//! announced even when its send failed. Never re-spamming a channel
//! wins over guaranteed delivery.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::news::{NewsFeed, NewsItem};
use crate::registry::{GameRegistry, RegistryError};
use crate::store::{AnnouncedIdStore, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("announcement send failed: {0}")]
pub struct AnnounceError(pub String);

/// Output-channel capability. The production implementation posts to
/// the configured announcement channel; tests record the calls.
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce_update(&self, game_name: &str, item: &NewsItem)
        -> Result<(), AnnounceError>;
}

#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameUpdates {
    pub display_name: String,
    pub new_items: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub tracked_games: usize,
    pub updates: Vec<GameUpdates>,
    pub failed_games: Vec<String>,
}

impl CycleReport {
    pub fn total_new_items(&self) -> usize {
        self.updates.iter().map(|update| update.new_items).sum()
    }

    pub fn no_games_tracked(&self) -> bool {
        self.tracked_games == 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// A cycle was already in flight; this trigger was rejected rather
    /// than allowed to race the id store.
    AlreadyRunning,
}

pub struct NewsPoller {
    registry: GameRegistry,
    store: AnnouncedIdStore,
    feed: Arc<dyn NewsFeed>,
    announcer: Arc<dyn Announcer>,
    max_tracked_ids: usize,
    in_flight: tokio::sync::Mutex<()>,
}

impl NewsPoller {
    pub fn new(
        registry: GameRegistry,
        store: AnnouncedIdStore,
        feed: Arc<dyn NewsFeed>,
        announcer: Arc<dyn Announcer>,
        max_tracked_ids: usize,
    ) -> Self {
        Self {
            registry,
            store,
            feed,
            announcer,
            max_tracked_ids,
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    /// Runs one full fetch-diff-announce-persist cycle. Single-flight:
    /// a trigger arriving while a cycle runs gets `AlreadyRunning`
    /// instead of interleaving reads and writes of the id store.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, CycleError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            info!("news cycle already in flight, rejecting trigger");
            return Ok(CycleOutcome::AlreadyRunning);
        };

        let games = self.registry.list().await?;
        if games.is_empty() {
            info!("no games tracked, skipping news cycle");
            return Ok(CycleOutcome::Completed(CycleReport::default()));
        }

        // One snapshot per cycle, shared across all games.
        let known_ids = self.store.read().await?;

        let mut report =
            CycleReport { tracked_games: games.len(), ..CycleReport::default() };
        let mut announced_ids: Vec<String> = Vec::new();

        for game in &games {
            let outcome = match self.feed.fetch(&game.app_id, &game.name).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    warn!(
                        app_id = %game.app_id,
                        game = %game.name,
                        error = %error,
                        "news fetch failed, skipping game this cycle"
                    );
                    report.failed_games.push(game.name.clone());
                    continue;
                }
            };

            let fresh: Vec<NewsItem> = outcome
                .items
                .into_iter()
                .filter(|item| {
                    !known_ids.contains(&item.gid) && !announced_ids.contains(&item.gid)
                })
                .collect();

            if fresh.is_empty() {
                continue;
            }

            for item in &fresh {
                // Sends are awaited one at a time; a failure is logged
                // and the remaining items are still attempted.
                if let Err(error) =
                    self.announcer.announce_update(&outcome.display_name, item).await
                {
                    warn!(
                        gid = %item.gid,
                        game = %outcome.display_name,
                        error = %error,
                        "announcement send failed"
                    );
                } else {
                    info!(gid = %item.gid, game = %outcome.display_name, "announced news item");
                }
            }

            announced_ids.extend(fresh.iter().map(|item| item.gid.clone()));
            report.updates.push(GameUpdates {
                display_name: outcome.display_name,
                new_items: fresh.len(),
            });
        }

        // Persisted once per cycle, send failures included: the id is
        // marked announced so the channel is never re-spammed.
        if !announced_ids.is_empty() {
            self.store.update(&announced_ids, self.max_tracked_ids).await?;
        }

        info!(
            tracked = report.tracked_games,
            new_items = report.total_new_items(),
            failed = report.failed_games.len(),
            "news cycle completed"
        );
        Ok(CycleOutcome::Completed(report))
    }
}

pub struct ScheduleHandle {
    task: tokio::task::JoinHandle<()>,
}

impl ScheduleHandle {
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for ScheduleHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawns the recurring poll schedule. The first cycle runs
/// immediately; a failed cycle is logged and never cancels the timer.
pub fn spawn_schedule(poller: Arc<NewsPoller>, interval: Duration) -> ScheduleHandle {
    info!(interval_secs = interval.as_secs(), "starting news poll schedule");

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match poller.run_cycle().await {
                Ok(CycleOutcome::Completed(report)) => {
                    info!(
                        new_items = report.total_new_items(),
                        "scheduled news cycle finished"
                    );
                }
                Ok(CycleOutcome::AlreadyRunning) => {
                    info!("scheduled news cycle skipped, another cycle is in flight");
                }
                Err(error) => {
                    warn!(error = %error, "scheduled news cycle failed");
                }
            }
        }
    });

    ScheduleHandle { task }
}
