//! Monthly financials chat bot
//!
//! Each sheet of a spreadsheet workbook holds one company's monthly figures.
//! The bot lets a chat user pick a company and a metric, then answers with a
//! month-by-month table and a line chart.
//!
//! - `data`: workbook access and column resolution
//! - `chart`: PNG line charts
//! - `interface`: sessions, outbound messages and the transport trait
//! - `bot`: the menu state machine and per-user dispatch
//! - `platforms`: Telegram long polling and a local REPL
//!
//! # Example
//!
//! ```rust,ignore
//! use finbot::{BotConfig, BotService, Event};
//!
//! let config = BotConfig::builder().with_env()?.build()?;
//! let service = BotService::from_config(&config)?;
//! let reply = service.dispatch("42", Event::Start).await?;
//! ```

pub mod bot;
pub mod chart;
pub mod config;
pub mod data;
pub mod error;
pub mod interface;
pub mod platforms;

pub use bot::{BotService, Event, MenuController};
pub use chart::{ChartImage, ChartRenderer};
pub use config::{BotConfig, BotConfigBuilder};
pub use data::{DataResolver, DatasetSource, Metric, MetricSeries, WorkbookSource};
pub use error::{FinbotError, Result};
pub use interface::{BotInterface, Outbound, Reply};
