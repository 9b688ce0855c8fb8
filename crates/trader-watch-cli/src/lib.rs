//! Trader Watch CLI — Chromium page driver, Telegram delivery and
//! configuration for the trader-watch core.

pub mod browser;
pub mod commands;
pub mod config;
pub mod telegram;

pub use browser::{ChromiumPage, ChromiumSession};
pub use config::WatchConfig;
pub use telegram::TelegramNotifier;
