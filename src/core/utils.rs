use once_cell::sync::Lazy;
use regex::Regex;

/// Leading "Artist - " (hyphen, en or em dash) in a track title
#[allow(clippy::expect_used)]
static ARTIST_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[^-–—]{2,50}\s*[-–—]\s*").expect("static regex"));

#[allow(clippy::expect_used)]
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Maximum length (in characters) of a sanitized filename stem
pub const FILENAME_MAX_CHARS: usize = 80;

/// Escapes text for Telegram HTML parse mode.
///
/// # Example
///
/// ```
/// use lashmedia::core::utils::escape_html;
///
/// assert_eq!(escape_html("Tom & Jerry <3"), "Tom &amp; Jerry &lt;3");
/// ```
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Escapes text for use inside a double-quoted HTML attribute.
pub fn escape_html_attr(text: &str) -> String {
    escape_html(text).replace('"', "&quot;")
}

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Makes a title safe to use as a filename stem.
///
/// Replaces path and shell-hostile characters (`/\:*?"<>|`) with `_`,
/// collapses whitespace and caps the result at [`FILENAME_MAX_CHARS`].
/// An empty result becomes `audio`.
///
/// # Example
///
/// ```
/// use lashmedia::core::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("AC/DC: Back  in Black"), "AC_DC_ Back in Black");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();
    let collapsed = collapse_whitespace(&replaced);
    let capped: String = collapsed.chars().take(FILENAME_MAX_CHARS).collect();
    let capped = capped.trim_end().to_string();
    if capped.is_empty() {
        "audio".to_string()
    } else {
        capped
    }
}

/// Title shown by Telegram's audio player: the track name without a
/// leading `Artist - ` part. Falls back to the full title when stripping
/// would leave nothing.
pub fn audio_display_title(title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        return "Audio".to_string();
    }
    let stripped = ARTIST_PREFIX.replace(title, "");
    let stripped = stripped.trim();
    if stripped.is_empty() {
        title.to_string()
    } else {
        stripped.to_string()
    }
}

/// Converts a byte count to megabytes (MiB).
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

/// Formats megabytes with one decimal, the way sizes appear in captions and the log.
pub fn format_mb(mb: f64) -> String {
    format!("{:.1}", mb)
}

/// Truncates to `max_chars` characters, appending `…` when something was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b>&c"), "a&lt;b&gt;&amp;c");
        assert_eq!(escape_html_attr(r#"https://x.y/?q="1"&a=2"#), "https://x.y/?q=&quot;1&quot;&amp;a=2");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename(r#"a/b\c:d*e?f"g<h>i|j"#), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_filename("  lots   of\tspace  "), "lots of space");
        assert_eq!(sanitize_filename(""), "audio");
        assert_eq!(sanitize_filename(&"x".repeat(200)).chars().count(), FILENAME_MAX_CHARS);
    }

    #[test]
    fn test_audio_display_title() {
        assert_eq!(audio_display_title("Imagine Dragons - Believer"), "Believer");
        assert_eq!(audio_display_title("Земфира — Искала"), "Искала");
        assert_eq!(audio_display_title("Believer"), "Believer");
        assert_eq!(audio_display_title("   "), "Audio");
    }

    #[test]
    fn test_size_formatting() {
        assert_eq!(format_mb(bytes_to_mb(12_897_485)), "12.3");
        assert_eq!(format_mb(0.0), "0.0");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdefghij", 5), "abcd…");
    }
}
