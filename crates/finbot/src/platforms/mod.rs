//! Platform-specific bot implementations
//!
//! Each platform turns its own input into [`Inbound`] events and hands them
//! to [`handle_inbound`], which runs the bot and delivers the reply through
//! the platform's [`BotInterface`].

pub mod cli;
pub mod telegram;

use crate::bot::{BotService, Event};
use crate::interface::{BotInterface, ChatRef};

pub use cli::{CliBot, CliInterface};
pub use telegram::{TelegramBot, TelegramClient, TelegramConfig};

/// An update translated into a bot event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub user_id: String,
    pub chat: ChatRef,
    pub event: Event,
    /// Callback to acknowledge, for button presses
    pub callback_id: Option<String>,
}

/// Dispatch one inbound event and deliver its reply
pub async fn handle_inbound(
    interface: &dyn BotInterface,
    service: &BotService,
    inbound: Inbound,
) {
    tracing::info!(user_id = %inbound.user_id, event = %inbound.event, "event received");

    if let Some(callback_id) = &inbound.callback_id {
        if let Err(e) = interface.acknowledge(callback_id).await {
            tracing::debug!("acknowledge failed: {e}");
        }
    }

    let reply = match service.dispatch(&inbound.user_id, inbound.event).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(user_id = %inbound.user_id, "dispatch failed: {e}");
            return;
        }
    };

    // Failures are already logged by deliver; the interaction ends here
    let _ = interface.deliver(&inbound.chat, &reply).await;
}

