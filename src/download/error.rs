use thiserror::Error;

/// Structured error type for fetch operations.
///
/// Every variant maps to a metrics label via [`FetchError::subcategory`] and
/// to a short text shown in the status message via [`FetchError::user_message`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// yt-dlp exited with a failure; carries the last meaningful stderr line
    #[error("yt-dlp failed: {0}")]
    Tool(String),

    /// yt-dlp did not finish within the allotted time
    #[error("yt-dlp timed out after {secs}s")]
    Timeout { secs: u64 },

    /// yt-dlp reported success but no output file shares the expected prefix
    #[error("downloaded file not found")]
    FileNotFound,

    /// Output exceeded the size ceiling and was deleted
    #[error("file too large: {size_mb:.1}MB (limit {limit_mb}MB)")]
    SizeExceeded { size_mb: f64, limit_mb: u64 },

    /// Media is longer than the duration ceiling; nothing was downloaded
    #[error("media too long: {minutes}min (limit {limit_minutes}min)")]
    DurationExceeded { minutes: u64, limit_minutes: u64 },

    /// The process could not be started at all (missing binary, permissions)
    #[error("failed to run yt-dlp: {0}")]
    Spawn(String),
}

impl FetchError {
    /// Returns subcategory for metrics
    pub fn subcategory(&self) -> &'static str {
        match self {
            FetchError::Tool(_) => "tool",
            FetchError::Timeout { .. } => "timeout",
            FetchError::FileNotFound => "file_not_found",
            FetchError::SizeExceeded { .. } => "size_exceeded",
            FetchError::DurationExceeded { .. } => "duration_exceeded",
            FetchError::Spawn(_) => "spawn",
        }
    }

    /// Short human-readable reason for the requester
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Tool(detail) => {
                if detail.is_empty() {
                    "Download failed".to_string()
                } else {
                    format!("Download failed: {}", detail)
                }
            }
            FetchError::Timeout { .. } => "Download timed out (5 minutes)".to_string(),
            FetchError::FileNotFound => "File not found".to_string(),
            FetchError::SizeExceeded { size_mb, limit_mb } => {
                format!("File is too large ({:.1}MB, limit {}MB)", size_mb, limit_mb)
            }
            FetchError::DurationExceeded { minutes, limit_minutes } => {
                format!("Too long ({} min, limit {} min)", minutes, limit_minutes)
            }
            FetchError::Spawn(_) => "Downloader is unavailable".to_string(),
        }
    }
}

/// Picks the line of yt-dlp stderr worth showing to a user.
///
/// Prefers the last `ERROR:` line with its prefix removed, otherwise the last
/// non-empty line, truncated to 200 characters.
pub fn summarize_stderr(stderr: &str) -> String {
    let line = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.starts_with("ERROR:"))
        .map(|l| l.trim_start_matches("ERROR:").trim())
        .or_else(|| stderr.lines().rev().map(str::trim).find(|l| !l.is_empty()))
        .unwrap_or("");
    line.chars().take(200).collect()
}
