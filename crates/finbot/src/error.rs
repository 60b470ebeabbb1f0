//! Error types for the finance bot

use thiserror::Error;

/// Finance bot specific errors
#[derive(Debug, Error)]
pub enum FinbotError {
    /// Event names a dataset the source does not have
    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    /// The dataset's columns cannot serve metric queries
    #[error("Column resolution failed for {dataset}: {reason}")]
    ColumnResolution {
        dataset: String,
        reason: String,
    },

    /// Event does not fit the current menu state
    #[error("Invalid transition: {event} while {state}")]
    InvalidTransition {
        state: String,
        event: String,
    },

    /// Spreadsheet could not be opened or read
    #[error("Workbook error: {0}")]
    Workbook(String),

    /// Chart could not be drawn
    #[error("Chart error: {0}")]
    Chart(String),

    /// Chat transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl FinbotError {
    /// Shorthand for a column resolution failure
    pub fn column(dataset: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ColumnResolution {
            dataset: dataset.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for finance bot operations
pub type Result<T> = std::result::Result<T, FinbotError>;

impl From<calamine::Error> for FinbotError {
    fn from(err: calamine::Error) -> Self {
        FinbotError::Workbook(err.to_string())
    }
}

impl From<anyhow::Error> for FinbotError {
    fn from(err: anyhow::Error) -> Self {
        FinbotError::Other(err.to_string())
    }
}
