//! Command handlers and the admission path shared by every entry point

use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId, ReplyParameters};

use super::types::{HandlerDeps, HandlerResult, PendingPick};
use crate::core::config;
use crate::core::cooldown::CooldownDecision;
use crate::core::metrics;
use crate::download::fetcher::FetchRequest;
use crate::download::platform::Platform;
use crate::download::queue::{Admission, Task};
use crate::download::ytdlp;
use crate::telegram::bot::{help_text, start_text};
use crate::telegram::{picker, Bot};

/// Where a request came from and where answers go
#[derive(Debug, Clone, Copy)]
pub(super) struct Origin {
    pub user_id: u64,
    pub chat_id: ChatId,
    pub message_id: Option<MessageId>,
}

impl Origin {
    pub fn from_message(msg: &Message) -> Option<Self> {
        let user = msg.from.as_ref()?;
        Some(Self {
            user_id: user.id.0,
            chat_id: msg.chat.id,
            message_id: Some(msg.id),
        })
    }
}

/// Replies under the origin message, falling back to a plain send.
pub(super) async fn reply(bot: &Bot, origin: &Origin, text: impl Into<String>) -> HandlerResult {
    let text = text.into();
    if let Some(message_id) = origin.message_id {
        match bot
            .send_message(origin.chat_id, &text)
            .reply_parameters(ReplyParameters::new(message_id))
            .await
        {
            Ok(_) => return Ok(()),
            Err(e) => log::debug!("Threaded reply failed in chat {}: {}", origin.chat_id, e),
        }
    }
    bot.send_message(origin.chat_id, text).await?;
    Ok(())
}

/// Text for a denied cooldown check
pub fn cooldown_text(remaining_secs: u64) -> String {
    format!("Wait {}s", remaining_secs)
}

/// Text for a task that waits behind others
pub fn queued_text(position: usize) -> String {
    format!("Added to queue. Position: {}. Please wait...", position)
}

/// Applies the cooldown gate. Returns `false` (after telling the user) when denied.
pub(super) async fn pass_cooldown(bot: &Bot, deps: &HandlerDeps, origin: &Origin) -> bool {
    match deps.cooldown.check_now(origin.user_id) {
        CooldownDecision::Allow => true,
        CooldownDecision::Deny { remaining_secs } => {
            log::info!("User {} is cooling down ({}s left)", origin.user_id, remaining_secs);
            metrics::record_admission("cooldown");
            if let Err(e) = reply(bot, origin, cooldown_text(remaining_secs)).await {
                log::warn!("Failed to send cooldown notice: {}", e);
            }
            false
        }
    }
}

/// Puts a task in the queue and tells the user where it landed.
pub(super) async fn enqueue(bot: &Bot, deps: &HandlerDeps, origin: &Origin, request: FetchRequest) -> HandlerResult {
    let task = Task::new(origin.user_id, origin.chat_id, origin.message_id, request);
    match deps.queue.enqueue(task).await {
        Ok(Admission::Started { id }) => {
            log::debug!("Task {} for user {} started", id, origin.user_id);
            Ok(())
        }
        Ok(Admission::Queued { position, .. }) => reply(bot, origin, queued_text(position)).await,
        Err(e) => reply(bot, origin, e.to_string()).await,
    }
}

/// Full admission path: cooldown first, then the queue (or the picker for searches).
pub(super) async fn submit(bot: &Bot, deps: &HandlerDeps, origin: &Origin, request: FetchRequest) -> HandlerResult {
    if !pass_cooldown(bot, deps, origin).await {
        return Ok(());
    }

    if deps.search_picker && request.platform == Platform::Search && request.item_id.is_none() {
        return offer_picks(bot, deps, origin, request).await;
    }

    enqueue(bot, deps, origin, request).await
}

/// Lists search hits as buttons; on listing failure the plain search is queued.
async fn offer_picks(bot: &Bot, deps: &HandlerDeps, origin: &Origin, request: FetchRequest) -> HandlerResult {
    let hits = match ytdlp::search(&deps.ytdl_bin, &request.input, config::picker::RESULTS).await {
        Ok(hits) if !hits.is_empty() => hits,
        Ok(_) => {
            log::info!("No picker results for {:?}, falling back to first hit", request.input);
            return enqueue(bot, deps, origin, request).await;
        }
        Err(e) => {
            log::warn!("Picker listing failed for {:?}: {}", request.input, e);
            return enqueue(bot, deps, origin, request).await;
        }
    };

    let mut send = bot
        .send_message(origin.chat_id, picker::PROMPT)
        .reply_markup(picker::keyboard(&hits));
    if let Some(message_id) = origin.message_id {
        send = send.reply_parameters(ReplyParameters::new(message_id).allow_sending_without_reply());
    }
    let sent = send.await?;

    deps.pending_picks.insert(
        (origin.chat_id.0, sent.id.0),
        PendingPick {
            requester: origin.user_id,
            query: request.input,
        },
    );
    Ok(())
}

pub(super) async fn handle_start_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> HandlerResult {
    bot.send_message(msg.chat.id, start_text(deps.cooldown.window_secs())).await?;
    Ok(())
}

pub(super) async fn handle_help_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> HandlerResult {
    bot.send_message(msg.chat.id, help_text(&deps.router.bot_username, &deps.router.search_prefix))
        .await?;
    Ok(())
}

pub(super) async fn handle_search_command(bot: &Bot, msg: &Message, deps: &HandlerDeps, query: &str) -> HandlerResult {
    let query = query.trim();
    let Some(origin) = Origin::from_message(msg) else {
        return Ok(());
    };
    if query.is_empty() {
        return reply(bot, &origin, "Usage: /search <song name>").await;
    }
    submit(bot, deps, &origin, FetchRequest::new(query, Platform::Search)).await
}

pub(super) async fn handle_status_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> HandlerResult {
    let text = match ytdlp::version(&deps.ytdl_bin).await {
        Some(version) => {
            let snapshot = deps.queue.snapshot().await;
            status_text(&version, deps.cooldown.tracked_users(), snapshot.pending, snapshot.in_flight)
        }
        None => "yt-dlp not installed".to_string(),
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

pub fn status_text(version: &str, tracked_users: u64, pending: usize, in_flight: bool) -> String {
    format!(
        "Bot working\nyt-dlp: {}\nActive users: {}\nQueue: {} pending downloads{}",
        version,
        tracked_users,
        pending,
        if in_flight { ", 1 in progress" } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_texts() {
        assert_eq!(cooldown_text(12), "Wait 12s");
        assert_eq!(queued_text(3), "Added to queue. Position: 3. Please wait...");
    }

    #[test]
    fn test_status_text() {
        assert_eq!(
            status_text("2024.08.06", 4, 2, true),
            "Bot working\nyt-dlp: 2024.08.06\nActive users: 4\nQueue: 2 pending downloads, 1 in progress"
        );
        assert!(status_text("x", 0, 0, false).ends_with("Queue: 0 pending downloads"));
    }
}
