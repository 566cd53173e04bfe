//! Chat platform capability boundary.
//!
//! The real Discord gateway client lives behind [`ChatTransport`]; the
//! bot only ever talks to that trait. `NoopChatTransport` keeps the
//! binary wireable without credentials and gives tests a quiet default.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use herald_core::news::NewsItem;
use herald_core::poller::{AnnounceError, Announcer};

use crate::commands::CommandHandler;
use crate::messages;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport send failed: {0}")]
    Send(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

/// One inbound chat message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub channel_id: String,
    pub author_id: String,
    pub author_is_bot: bool,
    pub text: String,
}

/// Voice channel membership at the moment a command arrives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoiceSnapshot {
    pub channel_name: String,
    pub member_names: Vec<String>,
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_message(&self) -> Result<Option<ChatMessage>, TransportError>;
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), TransportError>;
    async fn reply(&self, to: &ChatMessage, text: &str) -> Result<(), TransportError>;
    /// Waits for the next message from `author_id` in `channel_id`.
    /// `Ok(None)` means the timeout elapsed.
    async fn await_reply(
        &self,
        channel_id: &str,
        author_id: &str,
        timeout: Duration,
    ) -> Result<Option<String>, TransportError>;
    /// Non-bot members of the voice channel the author currently
    /// occupies, or `None` when the author is not in one.
    async fn voice_members(
        &self,
        author_id: &str,
    ) -> Result<Option<VoiceSnapshot>, TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopChatTransport;

#[async_trait]
impl ChatTransport for NoopChatTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_message(&self) -> Result<Option<ChatMessage>, TransportError> {
        Ok(None)
    }

    async fn send_message(&self, _channel_id: &str, _text: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn reply(&self, _to: &ChatMessage, _text: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn await_reply(
        &self,
        _channel_id: &str,
        _author_id: &str,
        _timeout: Duration,
    ) -> Result<Option<String>, TransportError> {
        Ok(None)
    }

    async fn voice_members(
        &self,
        _author_id: &str,
    ) -> Result<Option<VoiceSnapshot>, TransportError> {
        Ok(None)
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Posts news updates to the fixed announcement channel.
pub struct TransportAnnouncer {
    transport: Arc<dyn ChatTransport>,
    channel_id: String,
}

impl TransportAnnouncer {
    pub fn new(transport: Arc<dyn ChatTransport>, channel_id: impl Into<String>) -> Self {
        Self { transport, channel_id: channel_id.into() }
    }
}

#[async_trait]
impl Announcer for TransportAnnouncer {
    async fn announce_update(
        &self,
        game_name: &str,
        item: &NewsItem,
    ) -> Result<(), AnnounceError> {
        self.transport
            .send_message(&self.channel_id, &messages::announcement(game_name, &item.url))
            .await
            .map_err(|error| AnnounceError(error.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Message pump: connects, reads messages, hands commands to the
/// handler, reconnects with backoff when the transport drops.
pub struct GatewayRunner {
    transport: Arc<dyn ChatTransport>,
    handler: Arc<CommandHandler>,
    reconnect_policy: ReconnectPolicy,
}

impl GatewayRunner {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        handler: Arc<CommandHandler>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, handler, reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "chat transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "chat transport retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "opening chat transport connection");
        self.transport.connect().await?;
        info!(attempt, "chat transport connected");

        loop {
            let Some(message) = self.transport.next_message().await? else {
                info!(attempt, "chat transport stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };

            if message.author_is_bot {
                continue;
            }

            if let Err(error) = self.handler.handle_message(&message).await {
                // A failed reply must not take the pump down.
                warn!(
                    channel_id = %message.channel_id,
                    error = %error,
                    "command handling failed"
                );
            }
        }
    }
}
