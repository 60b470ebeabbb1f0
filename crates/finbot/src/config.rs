//! Configuration for the finance bot

use crate::error::{FinbotError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default workbook the bot reads companies from
pub const DEFAULT_WORKBOOK: &str = "Data-test-companies.xlsx";

/// Default Telegram Bot API endpoint
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Configuration for the finance bot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Spreadsheet whose worksheets are the datasets
    pub workbook_path: PathBuf,

    /// Chart width in pixels
    pub chart_width: u32,

    /// Chart height in pixels
    pub chart_height: u32,

    /// Long polling timeout for `getUpdates`
    pub poll_timeout: Duration,

    /// Telegram Bot API base URL
    pub telegram_api_base: String,

    /// Bot token from BotFather (never stored in source)
    #[serde(skip_serializing)]
    pub telegram_token: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            workbook_path: PathBuf::from(DEFAULT_WORKBOOK),
            chart_width: 1000,
            chart_height: 600,
            poll_timeout: Duration::from_secs(30),
            telegram_api_base: DEFAULT_TELEGRAM_API_BASE.to_string(),
            telegram_token: None,
        }
    }
}

impl BotConfig {
    /// Create a new configuration builder
    pub fn builder() -> BotConfigBuilder {
        BotConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.chart_width < 200 || self.chart_height < 150 {
            return Err(FinbotError::Config(format!(
                "chart size {}x{} is too small",
                self.chart_width, self.chart_height
            )));
        }

        if self.poll_timeout.is_zero() {
            return Err(FinbotError::Config(
                "poll_timeout must be greater than 0".to_string(),
            ));
        }

        if self.telegram_api_base.trim().is_empty() {
            return Err(FinbotError::Config(
                "telegram_api_base must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Token required by the Telegram transport
    pub fn require_token(&self) -> Result<&str> {
        self.telegram_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| FinbotError::Config("TELEGRAM_BOT_TOKEN not set".to_string()))
    }
}

/// Builder for BotConfig
#[derive(Debug, Default)]
pub struct BotConfigBuilder {
    workbook_path: Option<PathBuf>,
    chart_width: Option<u32>,
    chart_height: Option<u32>,
    poll_timeout: Option<Duration>,
    telegram_api_base: Option<String>,
    telegram_token: Option<String>,
}

impl BotConfigBuilder {
    /// Set the workbook path
    pub fn workbook_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.workbook_path = Some(path.into());
        self
    }

    /// Set the chart size in pixels
    pub fn chart_size(mut self, width: u32, height: u32) -> Self {
        self.chart_width = Some(width);
        self.chart_height = Some(height);
        self
    }

    /// Set the long polling timeout
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = Some(timeout);
        self
    }

    /// Set the Bot API base URL
    pub fn telegram_api_base(mut self, base: impl Into<String>) -> Self {
        self.telegram_api_base = Some(base.into());
        self
    }

    /// Set the bot token
    pub fn telegram_token(mut self, token: impl Into<String>) -> Self {
        self.telegram_token = Some(token.into());
        self
    }

    /// Fill unset fields from the environment
    ///
    /// Reads `FINBOT_WORKBOOK`, `TELEGRAM_BOT_TOKEN`, `TELEGRAM_API_BASE` and
    /// `FINBOT_POLL_TIMEOUT_SECS`. Values set explicitly on the builder win.
    pub fn with_env(mut self) -> Result<Self> {
        if self.workbook_path.is_none() {
            if let Ok(path) = std::env::var("FINBOT_WORKBOOK") {
                self.workbook_path = Some(PathBuf::from(path));
            }
        }
        if self.telegram_token.is_none() {
            self.telegram_token = std::env::var("TELEGRAM_BOT_TOKEN").ok();
        }
        if self.telegram_api_base.is_none() {
            self.telegram_api_base = std::env::var("TELEGRAM_API_BASE").ok();
        }
        if self.poll_timeout.is_none() {
            if let Ok(raw) = std::env::var("FINBOT_POLL_TIMEOUT_SECS") {
                let secs = raw.trim().parse::<u64>().map_err(|_| {
                    FinbotError::Config(format!("FINBOT_POLL_TIMEOUT_SECS is not a number: {raw}"))
                })?;
                self.poll_timeout = Some(Duration::from_secs(secs));
            }
        }
        Ok(self)
    }

    /// Build the configuration
    pub fn build(self) -> Result<BotConfig> {
        let defaults = BotConfig::default();

        let config = BotConfig {
            workbook_path: self.workbook_path.unwrap_or(defaults.workbook_path),
            chart_width: self.chart_width.unwrap_or(defaults.chart_width),
            chart_height: self.chart_height.unwrap_or(defaults.chart_height),
            poll_timeout: self.poll_timeout.unwrap_or(defaults.poll_timeout),
            telegram_api_base: self
                .telegram_api_base
                .unwrap_or(defaults.telegram_api_base),
            telegram_token: self.telegram_token,
        };

        config.validate()?;
        Ok(config)
    }
}
