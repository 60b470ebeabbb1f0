//! CLI bot
//!
//! Local stand-in for a chat: menus are printed as numbered lists, a number
//! presses the matching button, charts are written into a directory.

use crate::bot::{BotService, Event};
use crate::error::{FinbotError, Result};
use crate::interface::{BotInterface, BotPlatform, ChatRef, MenuOption, Outbound};
use crate::platforms::{Inbound, handle_inbound};
use async_trait::async_trait;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const CLI_USER: &str = "cli";
const HINT: &str = "Введите /start, /restart, /quit или номер пункта меню.";

/// Prints replies to a writer and saves charts to `out_dir`
pub struct CliInterface<W> {
    writer: Mutex<W>,
    out_dir: PathBuf,
    last_menu: Mutex<Vec<MenuOption>>,
}

impl<W: Write + Send> CliInterface<W> {
    pub fn new(writer: W, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            writer: Mutex::new(writer),
            out_dir: out_dir.into(),
            last_menu: Mutex::new(Vec::new()),
        }
    }

    /// Payload of option `number` (1-based) of the last menu shown
    pub fn option_payload(&self, number: usize) -> Option<String> {
        let menu = self
            .last_menu
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        number
            .checked_sub(1)
            .and_then(|idx| menu.get(idx))
            .map(|option| option.payload.clone())
    }

    fn write_line(&self, line: &str) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }

    pub fn into_writer(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl<W: Write + Send + 'static> BotInterface for CliInterface<W> {
    fn platform(&self) -> BotPlatform {
        BotPlatform::CLI
    }

    async fn send(&self, _chat: &ChatRef, message: &Outbound) -> Result<()> {
        match message {
            Outbound::Menu(menu) => {
                let mut text = menu.caption.clone();
                for (i, option) in menu.options.iter().enumerate() {
                    text.push_str(&format!("\n  {}. {}", i + 1, option.label));
                }
                *self
                    .last_menu
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner) = menu.options.clone();
                self.write_line(&text)
            }
            Outbound::Text(text) => self.write_line(text),
            Outbound::Image(image) => {
                std::fs::create_dir_all(&self.out_dir)?;
                let path = self.out_dir.join(&image.filename);
                std::fs::write(&path, &image.bytes).map_err(|e| {
                    FinbotError::Transport(format!("cannot write {}: {e}", path.display()))
                })?;
                self.write_line(&format!("[chart saved to {}]", path.display()))
            }
        }
    }
}

/// Interactive bot over stdin-like input
pub struct CliBot<W> {
    interface: CliInterface<W>,
    service: BotService,
}

impl<W: Write + Send + 'static> CliBot<W> {
    pub fn new(service: BotService, interface: CliInterface<W>) -> Self {
        Self { interface, service }
    }

    /// Turn one input line into an event
    pub fn parse_line(&self, line: &str) -> Option<Event> {
        let line = line.trim();
        if let Some(event) = Event::parse_command(line) {
            return Some(event);
        }

        let payload = self.interface.option_payload(line.parse().ok()?)?;
        match Event::decode(&payload, self.service.controller().datasets()) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!("menu option rejected: {e}");
                None
            }
        }
    }

    /// Read lines until end of input
    pub async fn run<R: AsyncBufRead + Unpin>(&self, input: R) -> Result<()> {
        let mut lines = input.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let Some(event) = self.parse_line(&line) else {
                self.interface.write_line(HINT)?;
                continue;
            };

            let inbound = Inbound {
                user_id: CLI_USER.to_string(),
                chat: ChatRef::new(CLI_USER),
                event,
                callback_id: None,
            };
            handle_inbound(&self.interface, &self.service, inbound).await;
        }

        self.service.forget(CLI_USER);
        tracing::info!("input closed");
        Ok(())
    }

    pub fn into_interface(self) -> CliInterface<W> {
        self.interface
    }
}
