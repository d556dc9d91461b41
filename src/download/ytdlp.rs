//! yt-dlp invocation details
//!
//! Argument construction per platform, the output template, and parsers for
//! the small print-only sub-invocations (title, duration, search listing).

use std::path::Path;
use tokio::process::Command;

use crate::core::config;
use crate::core::process::run_for_stdout;
use crate::download::error::FetchError;
use crate::download::platform::Platform;

/// URL fetched when a search result was picked by id
pub fn youtube_watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// What yt-dlp is pointed at: the URL itself, a picked search result, or a
/// `ytsearch1:` directive for free-text search.
pub fn target(input: &str, platform: Platform, item_id: Option<&str>) -> String {
    match (platform, item_id) {
        (_, Some(id)) => youtube_watch_url(id),
        (Platform::Search, None) => format!("ytsearch1:{}", input),
        _ => input.to_string(),
    }
}

/// `-o` template: yt-dlp fills in the extension.
pub fn output_template(base: &Path) -> String {
    format!("{}.%(ext)s", base.display())
}

fn audio_extraction_args(args: &mut Vec<String>) {
    args.extend(
        ["-x", "--audio-format", "mp3", "--audio-quality", "0"]
            .iter()
            .map(|s| s.to_string()),
    );
}

/// Builds the main download argument list.
///
/// `cookies` is only honored for Yandex Music and only when provided; the
/// caller checks the file exists.
pub fn download_args(
    target: &str,
    platform: Platform,
    template: &str,
    cookies: Option<&Path>,
    max_height: u32,
) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();

    match platform {
        Platform::Search => {
            args.push("--no-playlist".to_string());
            audio_extraction_args(&mut args);
        }
        Platform::YandexMusic => {
            if let Some(cookies) = cookies {
                args.push("--cookies".to_string());
                args.push(cookies.display().to_string());
            }
            audio_extraction_args(&mut args);
        }
        Platform::YouTube => {
            args.push("-f".to_string());
            args.push(format!(
                "bestvideo[height<={h}]+bestaudio/best[height<={h}]/best",
                h = max_height
            ));
            args.push("--merge-output-format".to_string());
            args.push("mp4".to_string());
        }
        Platform::TikTok | Platform::Instagram => {
            args.push("-f".to_string());
            args.push("best".to_string());
        }
    }

    args.push("-o".to_string());
    args.push(template.to_string());
    args.push(target.to_string());
    args
}

/// Arguments for the print-title-only mode
pub fn title_args(target: &str) -> Vec<String> {
    vec!["--get-title".into(), "--no-warnings".into(), target.into()]
}

/// Arguments for the print-duration mode
pub fn duration_args(target: &str) -> Vec<String> {
    vec![
        "--print".into(),
        "duration".into(),
        "--no-warnings".into(),
        "--no-playlist".into(),
        "--skip-download".into(),
        target.into(),
    ]
}

/// Arguments listing the first `count` search results as `id<TAB>title`
pub fn search_listing_args(query: &str, count: usize) -> Vec<String> {
    vec![
        format!("ytsearch{}:{}", count, query),
        "--flat-playlist".into(),
        "--no-warnings".into(),
        "--print".into(),
        "%(id)s\t%(title)s".into(),
    ]
}

/// Parses `--print duration` output (seconds, possibly fractional or `NA`).
pub fn parse_duration_secs(stdout: &str) -> Option<u64> {
    let first = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    let secs = first.parse::<f64>().ok()?;
    if secs.is_finite() && secs >= 0.0 {
        Some(secs.round() as u64)
    } else {
        None
    }
}

/// A single search result offered to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
}

/// Parses `id<TAB>title` lines, skipping malformed ones.
pub fn parse_search_listing(stdout: &str) -> Vec<SearchHit> {
    stdout
        .lines()
        .filter_map(|line| {
            let (id, title) = line.split_once('\t')?;
            let id = id.trim();
            if id.is_empty() || id == "NA" {
                return None;
            }
            let title = match title.trim() {
                "" | "NA" => id,
                t => t,
            };
            Some(SearchHit {
                id: id.to_string(),
                title: title.to_string(),
            })
        })
        .collect()
}

/// Runs `yt-dlp --version`; `None` when the binary is missing or fails.
pub async fn version(bin: &str) -> Option<String> {
    let mut cmd = Command::new(bin);
    cmd.arg("--version");
    match run_for_stdout(&mut cmd, config::download::probe_timeout()).await {
        Ok(out) => Some(out.trim().to_string()).filter(|v| !v.is_empty()),
        Err(e) => {
            log::warn!("yt-dlp version probe failed: {}", e);
            None
        }
    }
}

/// Lists search results for the picker.
pub async fn search(bin: &str, query: &str, count: usize) -> Result<Vec<SearchHit>, FetchError> {
    let mut cmd = Command::new(bin);
    cmd.args(search_listing_args(query, count));
    let stdout = run_for_stdout(&mut cmd, config::download::probe_timeout()).await?;
    Ok(parse_search_listing(&stdout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn test_target() {
        assert_eq!(target("believer", Platform::Search, None), "ytsearch1:believer");
        assert_eq!(
            target("believer", Platform::Search, Some("7wtfhZwyrcc")),
            "https://www.youtube.com/watch?v=7wtfhZwyrcc"
        );
        assert_eq!(target("https://youtu.be/x", Platform::YouTube, None), "https://youtu.be/x");
    }

    #[test]
    fn test_search_args() {
        let args = download_args("ytsearch1:believer", Platform::Search, "/tmp/search_1.%(ext)s", None, 1080);
        assert_eq!(
            args,
            vec![
                "--no-playlist",
                "-x",
                "--audio-format",
                "mp3",
                "--audio-quality",
                "0",
                "-o",
                "/tmp/search_1.%(ext)s",
                "ytsearch1:believer"
            ]
        );
    }

    #[test]
    fn test_yandex_cookies_only_when_given() {
        let cookies = PathBuf::from("/srv/cookies.txt");
        let with = download_args("u", Platform::YandexMusic, "t", Some(&cookies), 1080);
        assert_eq!(&with[..2], &["--cookies".to_string(), "/srv/cookies.txt".to_string()]);
        assert!(with.contains(&"-x".to_string()));

        let without = download_args("u", Platform::YandexMusic, "t", None, 1080);
        assert!(!without.contains(&"--cookies".to_string()));
    }

    #[test]
    fn test_cookies_ignored_for_video() {
        let cookies = PathBuf::from("/srv/cookies.txt");
        let args = download_args("u", Platform::TikTok, "t", Some(&cookies), 1080);
        assert_eq!(args, vec!["-f", "best", "-o", "t", "u"]);
    }

    #[test]
    fn test_youtube_height_ceiling() {
        let args = download_args("u", Platform::YouTube, "t", None, 720);
        assert_eq!(args[1], "bestvideo[height<=720]+bestaudio/best[height<=720]/best");
        assert!(args.contains(&"--merge-output-format".to_string()));
    }

    #[test]
    fn test_output_template() {
        assert_eq!(output_template(Path::new("/tmp/youtube_17")), "/tmp/youtube_17.%(ext)s");
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration_secs("213\n"), Some(213));
        assert_eq!(parse_duration_secs("212.6"), Some(213));
        assert_eq!(parse_duration_secs("NA"), None);
        assert_eq!(parse_duration_secs(""), None);
    }

    #[test]
    fn test_parse_search_listing() {
        let out = "abc123\tImagine Dragons - Believer\nbroken line\nxyz\tNA\n\tno id\n";
        assert_eq!(
            parse_search_listing(out),
            vec![
                SearchHit {
                    id: "abc123".into(),
                    title: "Imagine Dragons - Believer".into()
                },
                SearchHit {
                    id: "xyz".into(),
                    title: "xyz".into()
                },
            ]
        );
    }
}
