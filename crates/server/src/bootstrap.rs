//! Wires config, stores, the news poller, and the chat gateway into a
//! runnable application.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use herald_core::config::AppConfig;
use herald_core::news::SteamNewsClient;
use herald_core::poller::{spawn_schedule, NewsPoller, ScheduleHandle};
use herald_core::registry::GameRegistry;
use herald_core::store::AnnouncedIdStore;
use herald_discord::commands::CommandHandler;
use herald_discord::transport::{
    ChatTransport, GatewayRunner, NoopChatTransport, ReconnectPolicy, TransportAnnouncer,
};

pub struct App {
    pub config: AppConfig,
    pub schedule: ScheduleHandle,
    pub gateway: GatewayRunner,
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<App> {
    // The wire-level Discord client plugs in here; everything above the
    // seam runs against the trait.
    let transport: Arc<dyn ChatTransport> = Arc::new(NoopChatTransport);

    let feed = Arc::new(
        SteamNewsClient::new(&config.steam).context("building the Steam news client")?,
    );
    let announcer = Arc::new(TransportAnnouncer::new(
        transport.clone(),
        config.discord.announce_channel_id.clone(),
    ));

    let registry = GameRegistry::new(config.storage.registry_path());
    let store = AnnouncedIdStore::new(config.storage.announced_ids_path());

    let poller = Arc::new(NewsPoller::new(
        registry.clone(),
        store,
        feed,
        announcer,
        config.poller.max_tracked_ids,
    ));

    let schedule =
        spawn_schedule(poller.clone(), Duration::from_secs(config.poller.interval_secs));

    let handler = Arc::new(CommandHandler::new(
        transport.clone(),
        poller.clone(),
        registry,
        config.discord.command_prefix.clone(),
        Duration::from_secs(config.discord.prompt_timeout_secs),
    ));
    let gateway = GatewayRunner::new(transport, handler, ReconnectPolicy::default());

    Ok(App { config, schedule, gateway })
}
