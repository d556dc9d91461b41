//! Classifies inbound text into a download, a search, or nothing.
//!
//! Pure logic over the message text plus two facts about the message
//! (private chat, reply to the bot), so it is tested without Telegram types.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::config;
use crate::core::utils::collapse_whitespace;
use crate::download::platform::{detect, Platform};

#[allow(clippy::expect_used)]
static URL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s]+").expect("static regex"));

/// Router configuration
#[derive(Debug, Clone)]
pub struct RouterSettings {
    /// Bot handle without `@`, lowercase
    pub bot_username: String,
    /// Prefix that turns a group message into a search
    pub search_prefix: String,
}

impl RouterSettings {
    pub fn from_env() -> Self {
        Self::new(&config::BOT_USERNAME, &config::GROUP_SEARCH_PREFIX)
    }

    pub fn new(bot_username: &str, search_prefix: &str) -> Self {
        Self {
            bot_username: bot_username.trim().trim_start_matches('@').to_lowercase(),
            search_prefix: search_prefix.to_string(),
        }
    }

    /// Same settings with the handle reported by Telegram
    pub fn with_username(mut self, bot_username: &str) -> Self {
        self.bot_username = bot_username.trim().trim_start_matches('@').to_lowercase();
        self
    }
}

/// The parts of a message the router looks at
#[derive(Debug, Clone, Copy)]
pub struct Inbound<'a> {
    pub text: &'a str,
    pub is_private: bool,
    pub is_reply_to_bot: bool,
}

/// Routing decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// A link to a supported platform
    Download { url: String, platform: Platform },
    /// A link nobody handles; answered only in private chats
    Unsupported,
    /// Free-text search
    Search(String),
    /// Not for us
    Ignore,
}

/// First `http(s)://` token in the text
pub fn extract_url(text: &str) -> Option<&str> {
    URL_REGEX.find(text).map(|m| m.as_str())
}

/// Returns the query left after removing every `@handle` mention, or `None`
/// when the handle is not mentioned or nothing else remains.
pub fn mention_query(text: &str, bot_username: &str) -> Option<String> {
    if bot_username.is_empty() {
        return None;
    }
    let pattern = format!(r"(?i)@{}\b", regex::escape(bot_username));
    let re = Regex::new(&pattern).ok()?;
    if !re.is_match(text) {
        return None;
    }
    let query = collapse_whitespace(&re.replace_all(text, ""));
    (!query.is_empty()).then_some(query)
}

/// Classifies one message.
pub fn route(msg: Inbound<'_>, settings: &RouterSettings) -> Route {
    let text = msg.text.trim();
    if text.is_empty() || text.starts_with('/') {
        return Route::Ignore;
    }

    if let Some(url) = extract_url(text) {
        return match detect(url) {
            Some(platform) => Route::Download {
                url: url.to_string(),
                platform,
            },
            None if msg.is_private => Route::Unsupported,
            None => Route::Ignore,
        };
    }

    if msg.is_private {
        return Route::Search(text.to_string());
    }

    if let Some(query) = mention_query(text, &settings.bot_username) {
        return Route::Search(query);
    }

    if !settings.search_prefix.is_empty() {
        if let Some(rest) = text.strip_prefix(settings.search_prefix.as_str()) {
            let query = rest.trim();
            return if query.is_empty() {
                Route::Ignore
            } else {
                Route::Search(query.to_string())
            };
        }
    }

    if msg.is_reply_to_bot {
        return Route::Search(text.to_string());
    }

    Route::Ignore
}
