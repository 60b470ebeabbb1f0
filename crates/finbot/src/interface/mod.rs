//! Bot platform interfaces
//!
//! Platform-agnostic pieces shared by every transport: sessions, outbound
//! messages and table formatting.

pub mod formatter;
pub mod interface;
pub mod message;
pub mod session;

pub use formatter::{format_report, format_table};
pub use interface::{BotInterface, BotPlatform, ChatRef};
pub use message::{Menu, MenuOption, Outbound, Reply};
pub use session::{MenuState, Session, SessionStore};
