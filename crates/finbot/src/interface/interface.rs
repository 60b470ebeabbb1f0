//! Bot interface trait and core abstractions
//!
//! Defines the platform-agnostic delivery side of a bot. Platforms turn
//! inbound updates into [`Event`](crate::bot::Event)s themselves and use this
//! trait to hand the resulting messages back to the user.

use crate::error::Result;
use crate::interface::message::{Outbound, Reply};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Platform identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BotPlatform {
    /// Command-line interface
    CLI,

    /// Telegram bot
    Telegram,
}

/// Where a reply goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRef {
    /// Chat or conversation id on the platform
    pub chat_id: String,

    /// Message holding the button that triggered the event, if any
    pub origin_message_id: Option<i64>,
}

impl ChatRef {
    pub fn new(chat_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            origin_message_id: None,
        }
    }

    pub fn with_origin(mut self, message_id: i64) -> Self {
        self.origin_message_id = Some(message_id);
        self
    }
}

/// Outbound side of a chat platform
#[async_trait]
pub trait BotInterface: Send + Sync {
    /// Platform this interface talks to
    fn platform(&self) -> BotPlatform;

    /// Send a single message
    async fn send(&self, chat: &ChatRef, message: &Outbound) -> Result<()>;

    /// Acknowledge a button press; platforms without one ignore it
    async fn acknowledge(&self, _callback_id: &str) -> Result<()> {
        Ok(())
    }

    /// Send every message of a reply, in order
    ///
    /// Stops at the first failure; nothing is retried.
    async fn deliver(&self, chat: &ChatRef, reply: &Reply) -> Result<()> {
        for message in &reply.messages {
            if let Err(e) = self.send(chat, message).await {
                tracing::warn!(
                    platform = ?self.platform(),
                    chat_id = %chat.chat_id,
                    kind = message.kind(),
                    "delivery failed: {e}"
                );
                return Err(e);
            }
        }
        Ok(())
    }
}
