//! Search result picker: lists a few hits as inline buttons and turns a
//! press into a search task for that exact video.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::core::config;
use crate::core::utils::truncate_chars;
use crate::download::ytdlp::SearchHit;

/// Prefix of callback data produced by the picker
pub const CALLBACK_PREFIX: &str = "pick:";

/// Prompt shown above the buttons
pub const PROMPT: &str = "Choose a track:";

pub fn callback_data(video_id: &str) -> String {
    format!("{}{}", CALLBACK_PREFIX, video_id)
}

/// Extracts the video id from callback data, if it is ours.
pub fn parse_callback(data: &str) -> Option<&str> {
    data.strip_prefix(CALLBACK_PREFIX)
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'))
}

/// One button per hit, one hit per row
pub fn keyboard(hits: &[SearchHit]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = hits
        .iter()
        .take(config::picker::RESULTS)
        .enumerate()
        .map(|(i, hit)| {
            let label = format!("{}. {}", i + 1, truncate_chars(&hit.title, config::picker::LABEL_MAX_CHARS));
            vec![InlineKeyboardButton::callback(label, callback_data(&hit.id))]
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}
