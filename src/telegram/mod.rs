//! Telegram bot integration and handlers

pub mod bot;
pub mod handlers;
pub mod picker;
pub mod router;
pub mod runner;
pub mod status;

pub type Bot = teloxide::Bot;

pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError};
pub use runner::BotTaskRunner;
