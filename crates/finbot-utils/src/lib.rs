//! Shared utilities for finbot
//!
//! This crate holds the pieces every finbot binary needs before the bot
//! itself starts, currently the tracing subscriber setup.

pub mod logging;

pub use logging::{LogFormat, init_tracing, subscriber};
