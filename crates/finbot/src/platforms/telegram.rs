//! Telegram bot implementation
//!
//! Long polling over the Bot API. Raw updates are translated into [`Event`]s
//! here, so nothing past this module sees Telegram payloads.

use crate::bot::{BotService, Event};
use crate::chart::ChartImage;
use crate::config::BotConfig;
use crate::error::{FinbotError, Result};
use crate::interface::{BotInterface, BotPlatform, ChatRef, Menu, Outbound};
use crate::platforms::{Inbound, handle_inbound};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

/// Telegram bot configuration
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot token from BotFather
    pub token: String,

    /// Bot API base URL
    pub api_base: String,

    /// Long polling timeout
    pub poll_timeout: Duration,
}

impl TelegramConfig {
    /// Take the Telegram settings out of the bot configuration
    pub fn from_bot_config(config: &BotConfig) -> Result<Self> {
        Ok(Self {
            token: config.require_token()?.to_string(),
            api_base: config.telegram_api_base.trim_end_matches('/').to_string(),
            poll_timeout: config.poll_timeout,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Incoming update, reduced to the fields the bot reads
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<TgMessage>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgMessage {
    pub message_id: i64,
    pub chat: TgChat,
    pub from: Option<TgUser>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgChat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgUser {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: TgUser,
    pub message: Option<TgMessage>,
    pub data: Option<String>,
}

/// Translate a raw update
///
/// Returns `None` for updates the bot does not react to. Button payloads
/// that cannot be decoded against `datasets` are logged and dropped.
pub fn translate(update: &Update, datasets: &[String]) -> Option<Inbound> {
    if let Some(query) = &update.callback_query {
        let message = query.message.as_ref()?;
        let payload = query.data.as_deref()?;
        let event = match Event::decode(payload, datasets) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(update_id = update.update_id, "ignoring button: {e}");
                return None;
            }
        };
        return Some(Inbound {
            user_id: query.from.id.to_string(),
            chat: ChatRef::new(message.chat.id.to_string()).with_origin(message.message_id),
            event,
            callback_id: Some(query.id.clone()),
        });
    }

    let message = update.message.as_ref()?;
    let event = Event::parse_command(message.text.as_deref()?)?;
    let user_id = message
        .from
        .as_ref()
        .map_or(message.chat.id, |user| user.id)
        .to_string();

    Some(Inbound {
        user_id,
        chat: ChatRef::new(message.chat.id.to_string()),
        event,
        callback_id: None,
    })
}

/// Inline keyboard with one button per row
pub fn inline_keyboard(menu: &Menu) -> Value {
    let rows: Vec<Value> = menu
        .options
        .iter()
        .map(|option| json!([{ "text": option.label, "callback_data": option.payload }]))
        .collect();
    json!({ "inline_keyboard": rows })
}

/// Minimal Bot API client
pub struct TelegramClient {
    client: Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.poll_timeout + Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            base_url: format!("{}/bot{}", config.api_base, config.token),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    async fn parse<T: DeserializeOwned>(method: &str, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body: ApiResponse<T> = response.json().await.map_err(|e| {
            FinbotError::Transport(format!("{method}: unreadable response ({status}): {e}"))
        })?;

        match (body.ok, body.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(FinbotError::Transport(format!(
                "{method} failed ({status}): {}",
                body.description.unwrap_or_else(|| "no description".to_string())
            ))),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: &Value) -> Result<T> {
        tracing::debug!(method, "telegram request");
        let response = self.client.post(self.url(method)).json(params).send().await?;
        Self::parse(method, response).await
    }

    /// Fetch updates after `offset`, waiting up to `timeout`
    pub async fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": timeout.as_secs(),
                "allowed_updates": ["message", "callback_query"],
            }),
        )
        .await
    }

    pub async fn send_message(&self, chat_id: &str, text: &str, markup: Option<Value>) -> Result<()> {
        let mut params = json!({ "chat_id": chat_id, "text": text });
        if let Some(markup) = markup {
            params["reply_markup"] = markup;
        }
        let _: Value = self.call("sendMessage", &params).await?;
        Ok(())
    }

    pub async fn edit_message_text(
        &self,
        chat_id: &str,
        message_id: i64,
        text: &str,
        markup: Option<Value>,
    ) -> Result<()> {
        let mut params = json!({ "chat_id": chat_id, "message_id": message_id, "text": text });
        if let Some(markup) = markup {
            params["reply_markup"] = markup;
        }
        let _: Value = self.call("editMessageText", &params).await?;
        Ok(())
    }

    pub async fn answer_callback_query(&self, callback_id: &str) -> Result<()> {
        let _: Value = self
            .call("answerCallbackQuery", &json!({ "callback_query_id": callback_id }))
            .await?;
        Ok(())
    }

    /// Upload a chart as a photo
    pub async fn send_photo(&self, chat_id: &str, image: &ChartImage) -> Result<()> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.filename.clone())
            .mime_str(&image.mime_type)?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("photo", part);

        tracing::debug!(method = "sendPhoto", bytes = image.bytes.len(), "telegram request");
        let response = self
            .client
            .post(self.url("sendPhoto"))
            .multipart(form)
            .send()
            .await?;
        let _: Value = Self::parse("sendPhoto", response).await?;
        Ok(())
    }
}

#[async_trait]
impl BotInterface for TelegramClient {
    fn platform(&self) -> BotPlatform {
        BotPlatform::Telegram
    }

    async fn send(&self, chat: &ChatRef, message: &Outbound) -> Result<()> {
        match message {
            Outbound::Menu(menu) => {
                let markup = Some(inline_keyboard(menu));
                match chat.origin_message_id {
                    Some(message_id) if menu.replace => {
                        self.edit_message_text(&chat.chat_id, message_id, &menu.caption, markup)
                            .await
                    }
                    _ => self.send_message(&chat.chat_id, &menu.caption, markup).await,
                }
            }
            Outbound::Text(text) => self.send_message(&chat.chat_id, text, None).await,
            Outbound::Image(image) => self.send_photo(&chat.chat_id, image).await,
        }
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<()> {
        self.answer_callback_query(callback_id).await
    }
}

type UserQueue = mpsc::UnboundedSender<Inbound>;

/// Telegram bot
pub struct TelegramBot {
    client: Arc<TelegramClient>,
    service: BotService,
    poll_timeout: Duration,
    queues: Mutex<HashMap<String, UserQueue>>,
}

impl TelegramBot {
    /// Create a new Telegram bot
    pub fn new(config: TelegramConfig, service: BotService) -> Result<Self> {
        Ok(Self {
            client: Arc::new(TelegramClient::new(&config)?),
            service,
            poll_timeout: config.poll_timeout,
            queues: Mutex::new(HashMap::new()),
        })
    }

    /// Poll for updates until the future is dropped
    pub async fn run(&self) -> Result<()> {
        let mut offset = 0;
        tracing::info!("telegram polling started");

        loop {
            match self.poll_once(offset).await {
                Ok(next) => offset = next,
                Err(e) => {
                    tracing::warn!("getUpdates failed: {e}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    }

    /// Fetch one batch of updates and queue them; returns the next offset
    pub async fn poll_once(&self, offset: i64) -> Result<i64> {
        let updates = self.client.get_updates(offset, self.poll_timeout).await?;

        let mut next = offset;
        for update in updates {
            next = next.max(update.update_id + 1);
            if let Some(inbound) = translate(&update, self.service.controller().datasets()) {
                self.enqueue(inbound);
            }
        }
        Ok(next)
    }

    /// Hand an event to its user's worker, starting the worker if needed
    ///
    /// One worker per user handles that user's events in arrival order;
    /// different users run in parallel.
    pub fn enqueue(&self, inbound: Inbound) {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);

        let inbound = match queues.get(&inbound.user_id) {
            Some(queue) => match queue.send(inbound) {
                Ok(()) => return,
                Err(mpsc::error::SendError(inbound)) => inbound,
            },
            None => inbound,
        };

        let (queue, events) = mpsc::unbounded_channel();
        tracing::debug!(user_id = %inbound.user_id, "starting user worker");
        queues.insert(inbound.user_id.clone(), queue.clone());
        tokio::spawn(user_worker(
            Arc::clone(&self.client),
            self.service.clone(),
            events,
        ));
        // The receiver was just handed to the worker, so it is still open
        let _ = queue.send(inbound);
    }
}

async fn user_worker(
    client: Arc<TelegramClient>,
    service: BotService,
    mut events: mpsc::UnboundedReceiver<Inbound>,
) {
    while let Some(inbound) = events.recv().await {
        handle_inbound(client.as_ref(), &service, inbound).await;
    }
}
