use teloxide::prelude::*;
use teloxide::types::{BotCommand, ChatKind, Me};
use teloxide::utils::command::BotCommands;

use crate::core::config;
use crate::telegram::Bot;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Commands:")]
pub enum Command {
    #[command(description = "start")]
    Start,
    #[command(description = "help")]
    Help,
    #[command(description = "search song")]
    Search(String),
    #[command(description = "check status")]
    Status,
}

/// Creates a Bot instance from BOT_TOKEN with a long request timeout for uploads
pub fn create_bot() -> anyhow::Result<Bot> {
    let token = config::BOT_TOKEN.trim();
    if token.is_empty() {
        anyhow::bail!("BOT_TOKEN (or TELOXIDE_TOKEN) is not set");
    }

    let client = teloxide::net::default_reqwest_settings()
        .timeout(config::network::timeout())
        .build()?;

    Ok(Bot::with_client(token, client))
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(vec![
        BotCommand::new("start", "start"),
        BotCommand::new("help", "help"),
        BotCommand::new("search", "search song"),
        BotCommand::new("status", "check status"),
    ])
    .await?;

    Ok(())
}

pub fn is_private(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

/// Whether `msg` replies to a message sent by this bot
pub fn is_reply_to_bot(msg: &Message, me: &Me) -> bool {
    msg.reply_to_message()
        .and_then(|reply| reply.from.as_ref())
        .is_some_and(|from| from.id == me.id)
}

/// Welcome text for /start
pub fn start_text(cooldown_secs: u64) -> String {
    format!(
        "Media Download Bot

Supports:
- Yandex.Music (tracks, albums)
- YouTube (video, shorts)
- TikTok (all videos)
- Instagram (reels, posts)

Automatic detection:
- Just send a link!
- Or type a song name to search on YouTube.

Limit: 1 request every {} seconds

Commands:
/start - start
/help - help
/search <name> - search song
/status - check status",
        cooldown_secs
    )
}

/// Usage text for /help
pub fn help_text(bot_username: &str, search_prefix: &str) -> String {
    format!(
        "How to use:

1. Send a link:
   - Yandex.Music, YouTube, TikTok, Instagram

2. Or just type the song name (e.g. \"Imagine Dragons Believer\")

Group chat:
Links are picked up automatically. To search, mention @{} with the song name, start the message with {}, or reply to one of my messages.

Yandex.Music note:
If a link doesn't work, try searching by name instead.",
        bot_username, search_prefix
    )
}
