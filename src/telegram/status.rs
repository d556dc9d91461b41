//! Live progress message for one task and final media delivery
//!
//! One status message per task: sent at start, edited through the phases,
//! deleted on success and left showing the error on failure. Every Telegram
//! call here is best-effort; failures are logged and never propagate.

use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, MessageId, ParseMode, ReplyParameters};
use teloxide::RequestError;

use crate::core::utils::{audio_display_title, escape_html, escape_html_attr, format_mb, sanitize_filename};
use crate::download::fetcher::FetchedMedia;
use crate::download::platform::Platform;
use crate::telegram::Bot;

/// Error texts Telegram returns when the bot can no longer write to a chat.
const DISABLED_DESTINATION_MARKERS: &[&str] = &[
    "topic_closed",
    "topic_deleted",
    "chat not found",
    "bot was blocked",
    "bot was kicked",
    "chat_write_forbidden",
    "not enough rights",
    "have no rights to send",
    "need administrator rights",
    "user is deactivated",
    "group chat was upgraded",
];

/// Whether an error message means the chat or thread is closed to the bot.
pub fn is_disabled_destination_text(message: &str) -> bool {
    let lower = message.to_lowercase();
    DISABLED_DESTINATION_MARKERS.iter().any(|m| lower.contains(m))
}

pub fn is_disabled_destination(err: &RequestError) -> bool {
    is_disabled_destination_text(&err.to_string())
}

fn log_request_error(action: &str, chat_id: ChatId, err: &RequestError) {
    if is_disabled_destination(err) {
        log::info!("Skipping {} in chat {}: destination closed ({})", action, chat_id, err);
    } else {
        log::warn!("Failed to {} in chat {}: {}", action, chat_id, err);
    }
}

/// Task phase shown in the status message
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Start(Platform),
    Downloading,
    Sending { size_mb: f64 },
    Error(String),
}

impl Phase {
    pub fn text(&self) -> String {
        match self {
            Phase::Start(Platform::Search) => "Searching...".to_string(),
            Phase::Start(platform) => format!("Detecting {}...", platform.tag()),
            Phase::Downloading => "Downloading...".to_string(),
            Phase::Sending { size_mb } => format!("Sending {}MB...", format_mb(*size_mb)),
            Phase::Error(reason) => format!("Error: {}", reason),
        }
    }
}

/// Owner of one task's status message.
///
/// When the initial send failed there is no message and every update is a no-op.
pub struct StatusReporter {
    bot: Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
}

impl StatusReporter {
    /// Sends the initial message, threaded under `reply_to` when possible.
    pub async fn start(bot: Bot, chat_id: ChatId, reply_to: Option<MessageId>, platform: Platform) -> Self {
        let text = Phase::Start(platform).text();

        let mut message_id = None;
        if let Some(reply_to) = reply_to {
            match bot
                .send_message(chat_id, &text)
                .reply_parameters(ReplyParameters::new(reply_to))
                .await
            {
                Ok(msg) => message_id = Some(msg.id),
                Err(e) => log_request_error("send threaded status", chat_id, &e),
            }
        }

        if message_id.is_none() {
            match bot.send_message(chat_id, &text).await {
                Ok(msg) => message_id = Some(msg.id),
                Err(e) => log_request_error("send status", chat_id, &e),
            }
        }

        Self {
            bot,
            chat_id,
            message_id,
        }
    }

    /// Edits the status message in place.
    pub async fn update(&self, phase: Phase) {
        let Some(message_id) = self.message_id else {
            return;
        };
        if let Err(e) = self.bot.edit_message_text(self.chat_id, message_id, phase.text()).await {
            log_request_error("edit status", self.chat_id, &e);
        }
    }

    /// Leaves the status message showing `Error: {reason}`.
    pub async fn fail(self, reason: &str) {
        self.update(Phase::Error(reason.to_string())).await;
    }

    /// Removes the status message before the result is delivered.
    pub async fn clear(&mut self) {
        if let Some(message_id) = self.message_id.take() {
            if let Err(e) = self.bot.delete_message(self.chat_id, message_id).await {
                log_request_error("delete status", self.chat_id, &e);
            }
        }
    }
}

/// HTML caption for a delivered file.
///
/// `link` is the original URL; searches get a plain `From Search` marker.
pub fn build_caption(title: &str, size_mb: f64, is_audio: bool, link: Option<&str>) -> String {
    let kind = if is_audio { "Audio" } else { "Video" };
    let source = match link {
        Some(link) => format!("<a href=\"{}\">Open link</a>", escape_html_attr(link)),
        None => "From Search".to_string(),
    };
    format!(
        "{}: {}\nSize: {}MB\n{}",
        kind,
        escape_html(title),
        format_mb(size_mb),
        source
    )
}

/// How delivery ended
#[derive(Debug)]
pub enum Delivery {
    Sent,
    /// Chat or thread closed to the bot; not a task failure
    DestinationClosed,
    Failed(RequestError),
}

/// Uploads the fetched file as audio or video.
pub async fn deliver(
    bot: &Bot,
    chat_id: ChatId,
    reply_to: Option<MessageId>,
    media: &FetchedMedia,
    is_audio: bool,
    link: Option<&str>,
) -> Delivery {
    let caption = build_caption(&media.title, media.size_mb(), is_audio, link);

    let result = if is_audio {
        let title = audio_display_title(&media.title);
        let file_name = format!("{}.mp3", sanitize_filename(&title));
        let mut request = bot
            .send_audio(chat_id, InputFile::file(&media.path).file_name(file_name))
            .title(title)
            .caption(caption)
            .parse_mode(ParseMode::Html);
        if let Some(reply_to) = reply_to {
            request = request.reply_parameters(ReplyParameters::new(reply_to).allow_sending_without_reply());
        }
        request.await.map(|_| ())
    } else {
        let mut request = bot
            .send_video(chat_id, InputFile::file(&media.path))
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .supports_streaming(true);
        if let Some(reply_to) = reply_to {
            request = request.reply_parameters(ReplyParameters::new(reply_to).allow_sending_without_reply());
        }
        request.await.map(|_| ())
    };

    match result {
        Ok(()) => Delivery::Sent,
        Err(e) if is_disabled_destination(&e) => {
            log_request_error("deliver media", chat_id, &e);
            Delivery::DestinationClosed
        }
        Err(e) => {
            log::error!("Failed to deliver {} to chat {}: {}", media.path.display(), chat_id, e);
            Delivery::Failed(e)
        }
    }
}
