//! Outbound message types

use crate::chart::ChartImage;
use serde::{Deserialize, Serialize};

/// A selectable menu entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuOption {
    /// Caption shown on the button
    pub label: String,
    /// Encoded event sent back when the button is pressed
    pub payload: String,
}

impl MenuOption {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// A list of options with a caption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub caption: String,
    pub options: Vec<MenuOption>,
    /// Edit the message that carried the pressed button instead of sending a new one
    pub replace: bool,
}

/// One message for the transport to deliver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outbound {
    Menu(Menu),
    Text(String),
    Image(ChartImage),
}

impl Outbound {
    pub fn text(content: impl Into<String>) -> Self {
        Outbound::Text(content.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Outbound::Menu(_) => "menu",
            Outbound::Text(_) => "text",
            Outbound::Image(_) => "image",
        }
    }
}

/// Messages answering one event, in delivery order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub messages: Vec<Outbound>,
}

impl Reply {
    pub fn new(messages: Vec<Outbound>) -> Self {
        Self { messages }
    }

    pub fn single(message: Outbound) -> Self {
        Self {
            messages: vec![message],
        }
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Self::single(Outbound::text(text))
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.messages.iter().map(Outbound::kind).collect()
    }
}
