//! Media fetcher: runs yt-dlp for one request and hands back a local file.
//!
//! Flow per request:
//! 1. optional duration probe (YouTube and search) when a ceiling is set
//! 2. download into `{dir}/{platform}_{timestamp_ms}.%(ext)s`
//! 3. locate the produced file by prefix, since yt-dlp picks the extension
//! 4. size guard, then a best-effort title lookup
//!
//! Any failure after the download started removes files sharing the prefix.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};
use tokio::process::Command;

use crate::core::config;
use crate::core::metrics;
use crate::core::process::run_with_timeout;
use crate::core::utils::bytes_to_mb;
use crate::download::error::{summarize_stderr, FetchError};
use crate::download::platform::Platform;
use crate::download::ytdlp;

/// Title used when yt-dlp cannot tell us one
pub const FALLBACK_TITLE: &str = "Media";

/// Suffixes yt-dlp uses for incomplete downloads
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl", ".temp"];

/// Everything the fetcher needs from configuration
#[derive(Debug, Clone)]
pub struct FetcherSettings {
    pub bin: String,
    pub output_dir: PathBuf,
    pub cookies_file: PathBuf,
    /// 0 disables the size guard
    pub max_file_size_mb: u64,
    /// 0 disables the duration guard
    pub max_duration_minutes: u64,
    pub max_video_height: u32,
    pub tool_timeout: Duration,
    pub title_timeout: Duration,
    pub probe_timeout: Duration,
}

impl FetcherSettings {
    pub fn from_env() -> Self {
        Self {
            bin: config::YTDL_BIN.clone(),
            output_dir: config::DOWNLOAD_DIR.clone(),
            cookies_file: config::MUSIC_COOKIES_FILE.clone(),
            max_file_size_mb: *config::download::MAX_FILE_SIZE_MB,
            max_duration_minutes: *config::download::MAX_DURATION_MINUTES,
            max_video_height: *config::download::MAX_VIDEO_HEIGHT,
            tool_timeout: config::download::tool_timeout(),
            title_timeout: config::download::title_timeout(),
            probe_timeout: config::download::probe_timeout(),
        }
    }
}

/// One fetch job: a URL or search text, its platform tag, and an optional
/// search result picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub input: String,
    pub platform: Platform,
    pub item_id: Option<String>,
}

impl FetchRequest {
    pub fn new(input: impl Into<String>, platform: Platform) -> Self {
        Self {
            input: input.into(),
            platform,
            item_id: None,
        }
    }

    pub fn with_item(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }

    /// Original link for captions, `None` for searches
    pub fn link(&self) -> Option<&str> {
        if self.input.starts_with("http://") || self.input.starts_with("https://") {
            Some(&self.input)
        } else {
            None
        }
    }
}

/// A finished download
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub path: PathBuf,
    pub title: String,
    pub size_bytes: u64,
}

impl FetchedMedia {
    pub fn size_mb(&self) -> f64 {
        bytes_to_mb(self.size_bytes)
    }

    /// Audio framing: music and search tags, or an `.mp3` file from anywhere
    pub fn is_audio(&self, platform: Platform) -> bool {
        platform.is_audio()
            || self
                .path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("mp3"))
    }
}

static LAST_STAMP: AtomicI64 = AtomicI64::new(0);

/// Millisecond timestamp that never repeats within this process.
fn next_stamp() -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    let mut last = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST_STAMP.compare_exchange_weak(last, candidate, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return candidate,
            Err(actual) => last = actual,
        }
    }
}

/// File stem shared by everything one fetch writes
pub fn output_stem(platform: Platform, stamp_ms: i64) -> String {
    format!("{}_{}", platform.tag(), stamp_ms)
}

fn is_partial(name: &str) -> bool {
    PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Finds the file yt-dlp produced for `stem` in `dir`.
///
/// Matches `{stem}.*`, skips partial downloads and picks the newest match.
pub fn find_output_file(dir: &Path, stem: &str) -> Option<PathBuf> {
    let prefix = format!("{}.", stem);
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::error!("Failed to read output dir {}: {}", dir.display(), e);
            return None;
        }
    };

    entries
        .filter_map(Result::ok)
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with(&prefix) && !is_partial(&name)
        })
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            meta.is_file().then(|| (meta.modified().ok(), entry.path()))
        })
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, path)| path)
}

/// Removes every `{stem}.*` file in `dir`. Returns how many went.
pub fn remove_with_prefix(dir: &Path, stem: &str) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    let prefix = format!("{}.", stem);
    let mut removed = 0;
    for entry in entries.filter_map(Result::ok) {
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => log::warn!("Failed to remove partial {}: {}", entry.path().display(), e),
            }
        }
    }
    removed
}

/// Runs yt-dlp for [`FetchRequest`]s
#[derive(Debug, Clone)]
pub struct MediaFetcher {
    settings: FetcherSettings,
}

impl MediaFetcher {
    pub fn new(settings: FetcherSettings) -> Self {
        Self { settings }
    }

    fn command(&self) -> Command {
        Command::new(&self.settings.bin)
    }

    /// Downloads the media for `request`.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchedMedia, FetchError> {
        let started = Instant::now();
        let platform = request.platform;
        let target = ytdlp::target(&request.input, platform, request.item_id.as_deref());

        if platform.checks_duration() && self.settings.max_duration_minutes > 0 {
            self.check_duration(&target).await?;
        }

        let stem = output_stem(platform, next_stamp());
        let base = self.settings.output_dir.join(&stem);

        let result = self.download(&target, platform, &base, &stem).await;
        if result.is_err() {
            let removed = remove_with_prefix(&self.settings.output_dir, &stem);
            if removed > 0 {
                log::info!("Removed {} partial file(s) for {}", removed, stem);
            }
        }
        let (path, size_bytes) = result?;

        let title = self.title(&target).await.unwrap_or_else(|| FALLBACK_TITLE.to_string());

        metrics::observe_fetch_duration(platform.tag(), started.elapsed().as_secs_f64());
        log::info!(
            "Fetched {} ({:.1}MB) for {} in {:.1}s",
            path.display(),
            bytes_to_mb(size_bytes),
            platform,
            started.elapsed().as_secs_f64()
        );

        Ok(FetchedMedia {
            path,
            title,
            size_bytes,
        })
    }

    async fn download(
        &self,
        target: &str,
        platform: Platform,
        base: &Path,
        stem: &str,
    ) -> Result<(PathBuf, u64), FetchError> {
        let cookies = (platform == Platform::YandexMusic && self.settings.cookies_file.exists())
            .then_some(self.settings.cookies_file.as_path());
        let template = ytdlp::output_template(base);
        let args = ytdlp::download_args(target, platform, &template, cookies, self.settings.max_video_height);

        log::info!("Running {} {}", self.settings.bin, args.join(" "));
        let mut cmd = self.command();
        cmd.args(&args);
        let output = run_with_timeout(&mut cmd, self.settings.tool_timeout).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::error!("yt-dlp exited with {}: {}", output.status, stderr.trim());
            return Err(FetchError::Tool(summarize_stderr(&stderr)));
        }

        let path = find_output_file(&self.settings.output_dir, stem).ok_or_else(|| {
            log::error!("No output file for {} in {}", stem, self.settings.output_dir.display());
            FetchError::FileNotFound
        })?;

        let size_bytes = fs::metadata(&path).map(|m| m.len()).map_err(|e| {
            log::error!("Failed to stat {}: {}", path.display(), e);
            FetchError::FileNotFound
        })?;

        let limit_mb = self.settings.max_file_size_mb;
        let size_mb = bytes_to_mb(size_bytes);
        if limit_mb > 0 && size_mb > limit_mb as f64 {
            log::warn!("{} is {:.1}MB, over the {}MB limit", path.display(), size_mb, limit_mb);
            if let Err(e) = fs::remove_file(&path) {
                log::warn!("Failed to remove oversized file {}: {}", path.display(), e);
            }
            return Err(FetchError::SizeExceeded { size_mb, limit_mb });
        }

        Ok((path, size_bytes))
    }

    /// Rejects media longer than the ceiling. An unknown duration passes.
    async fn check_duration(&self, target: &str) -> Result<(), FetchError> {
        let mut cmd = self.command();
        cmd.args(ytdlp::duration_args(target));
        let secs = match run_with_timeout(&mut cmd, self.settings.probe_timeout).await {
            Ok(output) if output.status.success() => {
                ytdlp::parse_duration_secs(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                log::warn!("Duration probe exited with {}", output.status);
                None
            }
            Err(e) => {
                log::warn!("Duration probe failed: {}", e);
                None
            }
        };

        let limit_minutes = self.settings.max_duration_minutes;
        match secs {
            Some(secs) if secs > limit_minutes * 60 => Err(FetchError::DurationExceeded {
                minutes: secs.div_ceil(60),
                limit_minutes,
            }),
            _ => Ok(()),
        }
    }

    /// Best-effort title lookup; errors are logged and dropped.
    async fn title(&self, target: &str) -> Option<String> {
        let mut cmd = self.command();
        cmd.args(ytdlp::title_args(target));
        match run_with_timeout(&mut cmd, self.settings.title_timeout).await {
            Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(str::to_string),
            Ok(output) => {
                log::warn!("Title lookup exited with {}", output.status);
                None
            }
            Err(e) => {
                log::warn!("Title lookup failed: {}", e);
                None
            }
        }
    }
}
