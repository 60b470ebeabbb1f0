//! Inbound events and their wire encoding
//!
//! Buttons carry a tagged payload so a dataset that happens to be named like
//! a metric or a command is still routed as a dataset.

use crate::data::Metric;
use crate::error::{FinbotError, Result};
use std::fmt;

const DATASET_PREFIX: &str = "dataset:";
const METRIC_PREFIX: &str = "metric:";
const RESTART: &str = "restart";
const QUIT: &str = "quit";

/// A user action, already translated from the transport's raw payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `/start` command
    Start,
    /// A dataset button was pressed
    DatasetChosen(String),
    /// A metric button was pressed
    MetricChosen(Metric),
    /// Back to the dataset menu
    Restart,
    /// End the conversation
    Quit,
}

/// Longest `callback_data` Telegram accepts, in bytes
pub const MAX_PAYLOAD_BYTES: usize = 64;

/// A menu button as carried in its payload
///
/// Datasets are referenced by their position in the catalog, so the payload
/// stays a few bytes long whatever the sheet is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Dataset(usize),
    Metric(Metric),
    Restart,
    Quit,
}

impl Button {
    /// Payload sent back when the button is pressed
    pub fn payload(&self) -> String {
        match self {
            Button::Dataset(index) => format!("{DATASET_PREFIX}{index}"),
            Button::Metric(metric) => format!("{METRIC_PREFIX}{}", metric.token()),
            Button::Restart => RESTART.to_string(),
            Button::Quit => QUIT.to_string(),
        }
    }

    /// Decode a button payload
    pub fn decode(payload: &str) -> Result<Self> {
        if let Some(index) = payload.strip_prefix(DATASET_PREFIX) {
            return index
                .parse()
                .map(Button::Dataset)
                .map_err(|_| FinbotError::Transport(format!("bad dataset index: {index:?}")));
        }

        if let Some(token) = payload.strip_prefix(METRIC_PREFIX) {
            return Metric::from_token(token)
                .map(Button::Metric)
                .ok_or_else(|| FinbotError::Transport(format!("unknown metric: {token}")));
        }

        match payload {
            RESTART => Ok(Button::Restart),
            QUIT => Ok(Button::Quit),
            other => Err(FinbotError::Transport(format!("unknown payload: {other}"))),
        }
    }

    /// Turn the button into an event, looking dataset indices up in `datasets`
    pub fn into_event(self, datasets: &[String]) -> Result<Event> {
        match self {
            Button::Dataset(index) => datasets
                .get(index)
                .map(|name| Event::DatasetChosen(name.clone()))
                .ok_or_else(|| FinbotError::UnknownDataset(format!("#{index}"))),
            Button::Metric(metric) => Ok(Event::MetricChosen(metric)),
            Button::Restart => Ok(Event::Restart),
            Button::Quit => Ok(Event::Quit),
        }
    }
}

impl Event {
    /// Decode a button payload against the dataset catalog
    pub fn decode(payload: &str, datasets: &[String]) -> Result<Self> {
        Button::decode(payload)?.into_event(datasets)
    }

    /// Parse a typed command such as `/start` or `/quit@finbot`
    ///
    /// Anything that is not one of the known commands yields `None`.
    pub fn parse_command(input: &str) -> Option<Self> {
        let input = input.trim();
        let command = input.strip_prefix('/')?.split_whitespace().next()?;
        let command = command.split('@').next().unwrap_or(command);

        match command.to_lowercase().as_str() {
            "start" => Some(Event::Start),
            "restart" => Some(Event::Restart),
            "quit" | "exit" => Some(Event::Quit),
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Start => f.write_str("start"),
            Event::DatasetChosen(name) => write!(f, "dataset {name}"),
            Event::MetricChosen(metric) => write!(f, "metric {metric}"),
            Event::Restart => f.write_str("restart"),
            Event::Quit => f.write_str("quit"),
        }
    }
}
