use once_cell::sync::Lazy;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Reads an environment variable and parses it, falling back to `default`
/// when the variable is missing or malformed.
fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("Ignoring malformed {}={:?}, using default", name, raw);
                default
            }
        },
        Err(_) => default,
    }
}

/// Reads a boolean flag: `1`, `true`, `yes`, `on` (case-insensitive) enable it.
fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Expands a leading `~` so paths from `.env` files behave like shell paths.
fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_default()
});

/// Bot handle used to detect mentions in group chats.
/// Read from BOT_USERNAME, leading `@` stripped, lowercased.
/// Replaced at startup by the handle reported by `getMe` when available.
pub static BOT_USERNAME: Lazy<String> = Lazy::new(|| {
    env::var("BOT_USERNAME")
        .unwrap_or_else(|_| "lashmedia_pro_bot".to_string())
        .trim()
        .trim_start_matches('@')
        .to_lowercase()
});

/// Cached yt-dlp binary path
/// Read once at startup from YTDL_BIN environment variable or defaults to "yt-dlp"
pub static YTDL_BIN: Lazy<String> = Lazy::new(|| env::var("YTDL_BIN").unwrap_or_else(|_| "yt-dlp".to_string()));

/// Directory where yt-dlp writes its output.
/// Read from DOWNLOAD_DIR, defaults to the OS temp dir. Supports `~`.
pub static DOWNLOAD_DIR: Lazy<PathBuf> = Lazy::new(|| match env::var("DOWNLOAD_DIR") {
    Ok(dir) if !dir.trim().is_empty() => expand_path(dir.trim()),
    _ => env::temp_dir(),
});

/// Cookie file passed to yt-dlp for Yandex Music when it exists on disk.
/// Read from MUSIC_COOKIES_FILE, default `cookies.txt` in the working directory.
pub static MUSIC_COOKIES_FILE: Lazy<PathBuf> =
    Lazy::new(|| expand_path(&env::var("MUSIC_COOKIES_FILE").unwrap_or_else(|_| "cookies.txt".to_string())));

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: downloads.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "downloads.sqlite".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: app.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "app.log".to_string()));

/// Character that turns a group message into a search (`!believer`).
pub static GROUP_SEARCH_PREFIX: Lazy<String> =
    Lazy::new(|| env::var("GROUP_SEARCH_PREFIX").unwrap_or_else(|_| "!".to_string()));

/// Show a list of search results to pick from instead of taking the first hit.
pub static SEARCH_PICKER: Lazy<bool> = Lazy::new(|| env_flag("SEARCH_PICKER"));

/// Per-user cooldown configuration
pub mod cooldown {
    use super::{env_parse, Duration, Lazy};

    /// Minimum number of seconds between two accepted requests of one user.
    pub static COOLDOWN_SECONDS: Lazy<u64> = Lazy::new(|| env_parse("COOLDOWN_SECONDS", 30));

    /// Upper bound on tracked users; least recently seen entries are evicted past it.
    pub static MAX_ENTRIES: Lazy<u64> = Lazy::new(|| env_parse("COOLDOWN_MAX_ENTRIES", 100_000));

    pub fn window() -> Duration {
        Duration::from_secs(*COOLDOWN_SECONDS)
    }
}

/// Queue admission configuration
pub mod queue {
    use super::{env_parse, Lazy};

    /// Maximum number of outstanding tasks (waiting + in flight).
    pub static MAX_QUEUE_SIZE: Lazy<usize> = Lazy::new(|| env_parse("MAX_QUEUE_SIZE", 50));

    /// Maximum number of outstanding tasks per user.
    pub static MAX_TASKS_PER_USER: Lazy<usize> = Lazy::new(|| env_parse("MAX_TASKS_PER_USER", 2));

    /// Capacity of the command channel feeding the queue worker.
    pub const COMMAND_BUFFER: usize = 64;
}

/// Download configuration
pub mod download {
    use super::{env_parse, Duration, Lazy};

    /// Timeout for the main yt-dlp download (in seconds)
    pub const TOOL_TIMEOUT_SECS: u64 = 300;

    /// Timeout for the `--get-title` sub-invocation (in seconds)
    pub const TITLE_TIMEOUT_SECS: u64 = 30;

    /// Timeout for the duration probe and search listing (in seconds)
    pub const PROBE_TIMEOUT_SECS: u64 = 30;

    /// Files above this size are dropped after download. 0 disables the guard.
    pub static MAX_FILE_SIZE_MB: Lazy<u64> = Lazy::new(|| env_parse("MAX_FILE_SIZE_MB", 50));

    /// Media longer than this is rejected before download. 0 disables the guard.
    pub static MAX_DURATION_MINUTES: Lazy<u64> = Lazy::new(|| env_parse("MAX_DURATION_MINUTES", 30));

    /// Height ceiling for video platforms.
    pub static MAX_VIDEO_HEIGHT: Lazy<u32> = Lazy::new(|| env_parse("MAX_VIDEO_HEIGHT", 1080));

    pub fn tool_timeout() -> Duration {
        Duration::from_secs(TOOL_TIMEOUT_SECS)
    }

    pub fn title_timeout() -> Duration {
        Duration::from_secs(TITLE_TIMEOUT_SECS)
    }

    pub fn probe_timeout() -> Duration {
        Duration::from_secs(PROBE_TIMEOUT_SECS)
    }
}

/// Stale temp-file sweeper configuration
pub mod cleanup {
    use super::Duration;

    /// Files older than this are removed (24 hours)
    pub const MAX_AGE_SECS: u64 = 24 * 60 * 60;

    /// How often the sweeper runs (6 hours)
    pub const INTERVAL_SECS: u64 = 6 * 60 * 60;

    pub fn max_age() -> Duration {
        Duration::from_secs(MAX_AGE_SECS)
    }

    pub fn interval() -> Duration {
        Duration::from_secs(INTERVAL_SECS)
    }
}

/// Dashboard HTTP server configuration
pub mod dashboard {
    use super::{env_parse, Lazy};

    /// Port for `/api/stats`, `/health` and `/metrics`. 0 disables the server.
    pub static PORT: Lazy<u16> = Lazy::new(|| env_parse("DASHBOARD_PORT", 5000));

    /// Number of entries returned in `recentDownloads`
    pub const RECENT_LIMIT: usize = 10;
}

/// Search picker configuration
pub mod picker {
    /// Number of search results offered as buttons
    pub const RESULTS: usize = 5;

    /// Maximum button label length (characters)
    pub const LABEL_MAX_CHARS: usize = 60;
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Bot API calls; uploads of large videos take a while.
    pub const REQUEST_TIMEOUT_SECS: u64 = 600;

    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parse_falls_back_on_garbage() {
        std::env::set_var("LASHMEDIA_TEST_PARSE", "not-a-number");
        assert_eq!(env_parse::<u64>("LASHMEDIA_TEST_PARSE", 7), 7);
        std::env::set_var("LASHMEDIA_TEST_PARSE", " 12 ");
        assert_eq!(env_parse::<u64>("LASHMEDIA_TEST_PARSE", 7), 12);
        std::env::remove_var("LASHMEDIA_TEST_PARSE");
        assert_eq!(env_parse::<u64>("LASHMEDIA_TEST_PARSE", 7), 7);
    }

    #[test]
    fn test_env_flag() {
        std::env::set_var("LASHMEDIA_TEST_FLAG", "TRUE");
        assert!(env_flag("LASHMEDIA_TEST_FLAG"));
        std::env::set_var("LASHMEDIA_TEST_FLAG", "0");
        assert!(!env_flag("LASHMEDIA_TEST_FLAG"));
        std::env::remove_var("LASHMEDIA_TEST_FLAG");
        assert!(!env_flag("LASHMEDIA_TEST_FLAG"));
    }

    #[test]
    fn test_timeouts() {
        assert_eq!(download::tool_timeout(), Duration::from_secs(300));
        assert_eq!(cleanup::max_age(), Duration::from_secs(86_400));
    }
}
