//! Discord integration - chat-facing half of the bot.
//!
//! This crate turns chat messages into calls against `herald-core`:
//! - **Transport** (`transport`) - the capability seam over the chat
//!   platform, plus the gateway message pump and reconnect policy
//! - **Commands** (`commands`) - `!gameUpdates`, `!trackedGames`,
//!   `!addTrackedGame`, team and trivia commands
//! - **Messages** (`messages`) - every user-facing string
//!
//! The real Discord wire client is deliberately out of scope; anything
//! implementing [`transport::ChatTransport`] plugs in at the seam. The
//! [`transport::TransportAnnouncer`] adapter carries news updates from
//! the poll cycle to the configured announcement channel.

pub mod commands;
pub mod messages;
pub mod transport;

pub use commands::{parse_command, BotCommand, CommandHandler};
pub use transport::{
    ChatMessage, ChatTransport, GatewayRunner, NoopChatTransport, ReconnectPolicy,
    TransportAnnouncer, TransportError, VoiceSnapshot,
};
