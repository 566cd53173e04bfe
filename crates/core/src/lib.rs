//! Herald core - news polling, tracked-game storage, and small game
//! utilities, independent of any chat platform.
//!
//! The chat side of the bot consumes this crate through two seams: the
//! [`news::NewsFeed`] trait (feed I/O) and the [`poller::Announcer`]
//! trait (output channel). Everything in between - the dedup id store,
//! the tracked-game registry, and the poll cycle itself - lives here
//! and is exercised directly by tests.

pub mod config;
pub mod news;
pub mod poller;
pub mod registry;
pub mod store;
pub mod teams;
pub mod trivia;

pub use config::{AppConfig, ConfigError, LoadOptions, LogFormat};
pub use news::{FetchError, FetchOutcome, NewsFeed, NewsItem, SteamNewsClient};
pub use poller::{
    spawn_schedule, AnnounceError, Announcer, CycleError, CycleOutcome, CycleReport, GameUpdates,
    NewsPoller, ScheduleHandle,
};
pub use registry::{GameRegistry, RegistryError, TrackedGame};
pub use store::{AnnouncedIdStore, StoreError};
pub use teams::{render_table, split_into_teams, Teams};
