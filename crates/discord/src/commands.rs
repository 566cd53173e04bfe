//! Command parsing and the flows behind each bot command.
//!
//! Commands are plain prefixed keywords (`!gameUpdates`, `!ping`, ...).
//! Every recognized command produces a user-visible reply, success or
//! failure; registry validation errors are surfaced verbatim, anything
//! unexpected gets the generic apology. Unrecognized text is ignored.

use std::sync::Arc;
use std::time::Duration;

use rand::thread_rng;
use tracing::warn;

use herald_core::poller::{CycleOutcome, NewsPoller};
use herald_core::registry::{GameRegistry, RegistryError};
use herald_core::teams::{render_table, split_into_teams};
use herald_core::trivia::{eight_ball_answer, roll_percentile};

use crate::messages;
use crate::transport::{ChatMessage, ChatTransport, TransportError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    Help,
    GameUpdates,
    TrackedGames,
    AddTrackedGame,
    RemoveTrackedGame,
    RandomTeams,
    Ping,
    Random,
    EightBall { question: String },
}

/// Maps prefixed message text to a command. Anything else, including
/// unknown prefixed keywords, is silently ignored.
pub fn parse_command(prefix: &str, text: &str) -> Option<BotCommand> {
    let trimmed = text.trim();
    let keyword = trimmed.strip_prefix(prefix)?;

    if let Some(question) = keyword.strip_prefix("8ball") {
        return Some(BotCommand::EightBall { question: question.trim().to_owned() });
    }

    match keyword {
        "help" => Some(BotCommand::Help),
        "gameUpdates" => Some(BotCommand::GameUpdates),
        "trackedGames" => Some(BotCommand::TrackedGames),
        "addTrackedGame" => Some(BotCommand::AddTrackedGame),
        "removeTrackedGame" => Some(BotCommand::RemoveTrackedGame),
        "randomTeams" => Some(BotCommand::RandomTeams),
        "ping" => Some(BotCommand::Ping),
        "random" => Some(BotCommand::Random),
        _ => None,
    }
}

pub struct CommandHandler {
    transport: Arc<dyn ChatTransport>,
    poller: Arc<NewsPoller>,
    registry: GameRegistry,
    command_prefix: String,
    prompt_timeout: Duration,
}

impl CommandHandler {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        poller: Arc<NewsPoller>,
        registry: GameRegistry,
        command_prefix: impl Into<String>,
        prompt_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            poller,
            registry,
            command_prefix: command_prefix.into(),
            prompt_timeout,
        }
    }

    pub async fn handle_message(&self, message: &ChatMessage) -> Result<(), TransportError> {
        let Some(command) = parse_command(&self.command_prefix, &message.text) else {
            return Ok(());
        };

        match command {
            BotCommand::Help => {
                self.transport.reply(message, &messages::help_text(&self.command_prefix)).await
            }
            BotCommand::Ping => self.transport.reply(message, &messages::ping_reply()).await,
            BotCommand::Random => {
                let roll = roll_percentile(&mut thread_rng());
                self.transport.reply(message, &messages::random_number(roll)).await
            }
            BotCommand::EightBall { question } => {
                let answer = eight_ball_answer(&mut thread_rng());
                self.transport
                    .reply(message, &messages::eight_ball_reply(&question, answer))
                    .await
            }
            BotCommand::TrackedGames => self.handle_tracked_games(message).await,
            BotCommand::AddTrackedGame => self.handle_add_game(message).await,
            BotCommand::RemoveTrackedGame => self.handle_remove_game(message).await,
            BotCommand::GameUpdates => self.handle_game_updates(message).await,
            BotCommand::RandomTeams => self.handle_random_teams(message).await,
        }
    }

    async fn handle_tracked_games(&self, message: &ChatMessage) -> Result<(), TransportError> {
        match self.registry.list().await {
            Ok(games) if games.is_empty() => {
                self.transport.reply(message, &messages::no_games_tracked()).await
            }
            Ok(games) => {
                self.transport.reply(message, &messages::tracked_games_list(&games)).await
            }
            Err(error) => {
                warn!(error = %error, "listing tracked games failed");
                self.transport.reply(message, &messages::apology()).await
            }
        }
    }

    async fn handle_add_game(&self, message: &ChatMessage) -> Result<(), TransportError> {
        self.transport.reply(message, &messages::add_prompt()).await?;

        let Some(input) = self.collect_follow_up(message).await? else {
            return self.transport.reply(message, &messages::prompt_timed_out()).await;
        };

        let Some((name, app_id)) = parse_add_input(&input) else {
            return self.transport.reply(message, &messages::add_invalid_format()).await;
        };

        match self.registry.add(&name, &app_id).await {
            Ok(game) => self.transport.reply(message, &messages::added_game(&game)).await,
            Err(error @ RegistryError::DuplicateApp { .. }) => {
                self.transport.reply(message, &error.to_string()).await
            }
            Err(error) => {
                warn!(error = %error, "adding tracked game failed");
                self.transport.reply(message, &messages::apology()).await
            }
        }
    }

    async fn handle_remove_game(&self, message: &ChatMessage) -> Result<(), TransportError> {
        self.transport.reply(message, &messages::remove_prompt()).await?;

        let Some(input) = self.collect_follow_up(message).await? else {
            return self.transport.reply(message, &messages::prompt_timed_out()).await;
        };

        match self.registry.remove(input.trim()).await {
            Ok(game) => self.transport.reply(message, &messages::removed_game(&game)).await,
            Err(error @ RegistryError::UnknownApp { .. }) => {
                self.transport.reply(message, &error.to_string()).await
            }
            Err(error) => {
                warn!(error = %error, "removing tracked game failed");
                self.transport.reply(message, &messages::apology()).await
            }
        }
    }

    async fn handle_game_updates(&self, message: &ChatMessage) -> Result<(), TransportError> {
        match self.poller.run_cycle().await {
            Ok(CycleOutcome::Completed(report)) => {
                self.transport.reply(message, &messages::cycle_summary(&report)).await
            }
            Ok(CycleOutcome::AlreadyRunning) => {
                self.transport.reply(message, &messages::check_already_running()).await
            }
            Err(error) => {
                warn!(error = %error, "manual news cycle failed");
                self.transport.reply(message, &messages::apology()).await
            }
        }
    }

    async fn handle_random_teams(&self, message: &ChatMessage) -> Result<(), TransportError> {
        let snapshot = self.transport.voice_members(&message.author_id).await?;

        let (players, channel_name) = match snapshot {
            Some(snapshot) => (snapshot.member_names, Some(snapshot.channel_name)),
            None => {
                // Not in a voice channel: collect names by hand.
                self.transport.reply(message, &messages::teams_prompt_manual()).await?;
                let Some(input) = self.collect_follow_up(message).await? else {
                    return self.transport.reply(message, &messages::prompt_timed_out()).await;
                };
                let names: Vec<String> = input
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_owned)
                    .collect();
                (names, None)
            }
        };

        if players.len() <= 1 {
            return self.transport.reply(message, &messages::teams_need_more_players()).await;
        }

        let teams = split_into_teams(&players, &mut thread_rng());
        let table = render_table(&teams);

        self.transport
            .send_message(&message.channel_id, &messages::teams_intro(channel_name.as_deref()))
            .await?;
        self.transport
            .send_message(&message.channel_id, &messages::teams_code_block(&table))
            .await
    }

    async fn collect_follow_up(
        &self,
        message: &ChatMessage,
    ) -> Result<Option<String>, TransportError> {
        self.transport
            .await_reply(&message.channel_id, &message.author_id, self.prompt_timeout)
            .await
    }
}

/// Splits `Game Name,AppID` on the first comma. Names may contain
/// further commas only if the app id is still the last segment, so the
/// split is on the last comma.
fn parse_add_input(input: &str) -> Option<(String, String)> {
    let (name, app_id) = input.rsplit_once(',')?;
    let name = name.trim();
    let app_id = app_id.trim();
    if name.is_empty() || app_id.is_empty() {
        return None;
    }
    Some((name.to_owned(), app_id.to_owned()))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use herald_core::news::{FetchError, FetchOutcome, NewsFeed};
    use herald_core::poller::NewsPoller;
    use herald_core::registry::GameRegistry;
    use herald_core::store::AnnouncedIdStore;

    use super::{parse_add_input, parse_command, BotCommand, CommandHandler};
    use crate::transport::{
        ChatMessage, ChatTransport, TransportAnnouncer, TransportError, VoiceSnapshot,
    };

    #[derive(Default)]
    struct ScriptedTransport {
        outbound: Mutex<Vec<String>>,
        follow_ups: Mutex<VecDeque<String>>,
        voice: Option<VoiceSnapshot>,
    }

    impl ScriptedTransport {
        fn with_follow_ups(follow_ups: &[&str]) -> Self {
            Self {
                follow_ups: Mutex::new(
                    follow_ups.iter().map(|text| (*text).to_owned()).collect(),
                ),
                ..Self::default()
            }
        }

        fn outbound(&self) -> Vec<String> {
            self.outbound.lock().expect("outbound lock").clone()
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn connect(&self) -> Result<(), TransportError> {
            Ok(())
        }

        async fn next_message(&self) -> Result<Option<ChatMessage>, TransportError> {
            Ok(None)
        }

        async fn send_message(
            &self,
            _channel_id: &str,
            text: &str,
        ) -> Result<(), TransportError> {
            self.outbound.lock().expect("outbound lock").push(text.to_owned());
            Ok(())
        }

        async fn reply(&self, _to: &ChatMessage, text: &str) -> Result<(), TransportError> {
            self.outbound.lock().expect("outbound lock").push(text.to_owned());
            Ok(())
        }

        async fn await_reply(
            &self,
            _channel_id: &str,
            _author_id: &str,
            _timeout: Duration,
        ) -> Result<Option<String>, TransportError> {
            Ok(self.follow_ups.lock().expect("follow up lock").pop_front())
        }

        async fn voice_members(
            &self,
            _author_id: &str,
        ) -> Result<Option<VoiceSnapshot>, TransportError> {
            Ok(self.voice.clone())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    struct EmptyFeed;

    #[async_trait]
    impl NewsFeed for EmptyFeed {
        async fn fetch(
            &self,
            app_id: &str,
            display_name: &str,
        ) -> Result<FetchOutcome, FetchError> {
            Ok(FetchOutcome {
                app_id: app_id.to_owned(),
                display_name: display_name.to_owned(),
                items: Vec::new(),
            })
        }
    }

    struct Fixture {
        _dir: TempDir,
        transport: Arc<ScriptedTransport>,
        handler: CommandHandler,
        registry: GameRegistry,
    }

    fn fixture(transport: ScriptedTransport) -> Fixture {
        let dir = TempDir::new().expect("temp dir");
        let registry = GameRegistry::new(dir.path().join("games.json"));
        let store = AnnouncedIdStore::new(dir.path().join("ids.txt"));
        let transport = Arc::new(transport);

        let announcer =
            Arc::new(TransportAnnouncer::new(transport.clone(), "announce-channel"));
        let poller = Arc::new(NewsPoller::new(
            registry.clone(),
            store,
            Arc::new(EmptyFeed),
            announcer,
            100,
        ));
        let handler = CommandHandler::new(
            transport.clone(),
            poller,
            registry.clone(),
            "!",
            Duration::from_secs(30),
        );

        Fixture { _dir: dir, transport, handler, registry }
    }

    fn message(text: &str) -> ChatMessage {
        ChatMessage {
            channel_id: "chan".to_owned(),
            author_id: "user".to_owned(),
            author_is_bot: false,
            text: text.to_owned(),
        }
    }

    #[test]
    fn keywords_parse_to_their_commands() {
        assert_eq!(parse_command("!", "!help"), Some(BotCommand::Help));
        assert_eq!(parse_command("!", "!gameUpdates"), Some(BotCommand::GameUpdates));
        assert_eq!(parse_command("!", "!trackedGames"), Some(BotCommand::TrackedGames));
        assert_eq!(parse_command("!", "!addTrackedGame"), Some(BotCommand::AddTrackedGame));
        assert_eq!(parse_command("!", "!removeTrackedGame"), Some(BotCommand::RemoveTrackedGame));
        assert_eq!(parse_command("!", "!randomTeams"), Some(BotCommand::RandomTeams));
        assert_eq!(parse_command("!", "!ping"), Some(BotCommand::Ping));
        assert_eq!(parse_command("!", "!random"), Some(BotCommand::Random));
        assert_eq!(
            parse_command("!", "!8ball will it rain"),
            Some(BotCommand::EightBall { question: "will it rain".to_owned() })
        );
        assert_eq!(parse_command("!", "hello there"), None);
        assert_eq!(parse_command("!", "!unknownCommand"), None);
    }

    #[test]
    fn add_input_splits_name_from_app_id() {
        assert_eq!(
            parse_add_input("Rematch, 2138720"),
            Some(("Rematch".to_owned(), "2138720".to_owned()))
        );
        assert_eq!(
            parse_add_input("Warhammer 40,000: Darktide,1361210"),
            Some(("Warhammer 40,000: Darktide".to_owned(), "1361210".to_owned()))
        );
        assert_eq!(parse_add_input("no comma here"), None);
        assert_eq!(parse_add_input("name,"), None);
    }

    #[tokio::test]
    async fn non_command_messages_are_ignored() {
        let fx = fixture(ScriptedTransport::default());
        fx.handler.handle_message(&message("just chatting")).await.expect("handle");
        assert!(fx.transport.outbound().is_empty());
    }

    #[tokio::test]
    async fn ping_answers_pong() {
        let fx = fixture(ScriptedTransport::default());
        fx.handler.handle_message(&message("!ping")).await.expect("handle");
        assert_eq!(fx.transport.outbound(), vec!["Pong!".to_owned()]);
    }

    #[tokio::test]
    async fn add_flow_registers_the_game() {
        let fx = fixture(ScriptedTransport::with_follow_ups(&["Rematch,2138720"]));
        fx.handler.handle_message(&message("!addTrackedGame")).await.expect("handle");

        let outbound = fx.transport.outbound();
        assert!(outbound[0].contains("game name and Steam app ID"));
        assert!(outbound[1].contains("Successfully added \"Rematch\""));

        let games = fx.registry.list().await.expect("list");
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].app_id, "2138720");
    }

    #[tokio::test]
    async fn add_flow_rejects_duplicates_verbatim() {
        let fx = fixture(ScriptedTransport::with_follow_ups(&["Rematch Again,2138720"]));
        fx.registry.add("Rematch", "2138720").await.expect("seed");

        fx.handler.handle_message(&message("!addTrackedGame")).await.expect("handle");

        let outbound = fx.transport.outbound();
        assert!(outbound[1].contains("already tracked as \"Rematch\""));
        assert_eq!(fx.registry.list().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn add_flow_times_out_politely() {
        let fx = fixture(ScriptedTransport::default());
        fx.handler.handle_message(&message("!addTrackedGame")).await.expect("handle");

        let outbound = fx.transport.outbound();
        assert!(outbound[1].contains("timed out"));
    }

    #[tokio::test]
    async fn add_flow_rejects_malformed_input() {
        let fx = fixture(ScriptedTransport::with_follow_ups(&["no separator"]));
        fx.handler.handle_message(&message("!addTrackedGame")).await.expect("handle");

        let outbound = fx.transport.outbound();
        assert!(outbound[1].contains("Invalid format"));
    }

    #[tokio::test]
    async fn remove_flow_deletes_the_game() {
        let fx = fixture(ScriptedTransport::with_follow_ups(&["2138720"]));
        fx.registry.add("Rematch", "2138720").await.expect("seed");

        fx.handler.handle_message(&message("!removeTrackedGame")).await.expect("handle");

        let outbound = fx.transport.outbound();
        assert!(outbound[1].contains("Successfully removed \"Rematch\""));
        assert!(fx.registry.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn remove_flow_reports_unknown_app_ids() {
        let fx = fixture(ScriptedTransport::with_follow_ups(&["404"]));
        fx.handler.handle_message(&message("!removeTrackedGame")).await.expect("handle");

        let outbound = fx.transport.outbound();
        assert!(outbound[1].contains("no tracked game found with app id 404"));
    }

    #[tokio::test]
    async fn manual_update_check_with_empty_registry_says_so() {
        let fx = fixture(ScriptedTransport::default());
        fx.handler.handle_message(&message("!gameUpdates")).await.expect("handle");

        let outbound = fx.transport.outbound();
        assert_eq!(outbound.len(), 1);
        assert!(outbound[0].contains("no games currently being tracked"));
    }

    #[tokio::test]
    async fn manual_update_check_summarizes_a_quiet_cycle() {
        let fx = fixture(ScriptedTransport::default());
        fx.registry.add("Rematch", "2138720").await.expect("seed");

        fx.handler.handle_message(&message("!gameUpdates")).await.expect("handle");

        let outbound = fx.transport.outbound();
        assert!(outbound[0].contains("No new announcements"));
    }

    #[tokio::test]
    async fn random_teams_uses_voice_members_when_available() {
        let transport = ScriptedTransport {
            voice: Some(VoiceSnapshot {
                channel_name: "General".to_owned(),
                member_names: vec![
                    "alice".to_owned(),
                    "bob".to_owned(),
                    "carol".to_owned(),
                    "dave".to_owned(),
                ],
            }),
            ..ScriptedTransport::default()
        };
        let fx = fixture(transport);

        fx.handler.handle_message(&message("!randomTeams")).await.expect("handle");

        let outbound = fx.transport.outbound();
        assert!(outbound[0].contains("participants from General"));
        assert!(outbound[1].starts_with("```"));
        assert!(outbound[1].contains("Team 1"));
    }

    #[tokio::test]
    async fn random_teams_falls_back_to_manual_names() {
        let fx = fixture(ScriptedTransport::with_follow_ups(&["alice, bob, carol"]));
        fx.handler.handle_message(&message("!randomTeams")).await.expect("handle");

        let outbound = fx.transport.outbound();
        assert!(outbound[0].contains("names of the participants"));
        assert!(outbound[1].contains("prepared the teams"));
        assert!(outbound[2].contains("Team 2"));
    }

    #[tokio::test]
    async fn random_teams_needs_at_least_two_players() {
        let fx = fixture(ScriptedTransport::with_follow_ups(&["just-me"]));
        fx.handler.handle_message(&message("!randomTeams")).await.expect("handle");

        let outbound = fx.transport.outbound();
        assert!(outbound[1].contains("at least two participants"));
    }
}
