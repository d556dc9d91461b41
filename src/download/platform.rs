use std::fmt;
use std::str::FromStr;

/// Source of a task: one of the supported services or a free-text search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    YandexMusic,
    YouTube,
    TikTok,
    Instagram,
    /// Synthetic tag for free-text search tasks; never returned by [`detect`]
    Search,
}

/// Domain fragments checked in order; first match wins.
const FRAGMENTS: &[(&str, Platform)] = &[
    ("music.yandex.", Platform::YandexMusic),
    ("youtube.com", Platform::YouTube),
    ("youtu.be", Platform::YouTube),
    ("tiktok.com", Platform::TikTok),
    ("instagram.com", Platform::Instagram),
];

/// Classifies a URL by substring match against known domain fragments.
///
/// Returns `None` for anything unrecognized.
///
/// # Example
///
/// ```
/// use lashmedia::download::platform::{detect, Platform};
///
/// assert_eq!(detect("https://music.yandex.ru/album/1/track/2"), Some(Platform::YandexMusic));
/// assert_eq!(detect("https://example.com/video"), None);
/// ```
pub fn detect(url: &str) -> Option<Platform> {
    let lower = url.to_lowercase();
    FRAGMENTS
        .iter()
        .find(|(fragment, _)| lower.contains(fragment))
        .map(|(_, platform)| *platform)
}

impl Platform {
    /// Every tag, in the order used for stats and demo data
    pub const ALL: [Platform; 5] = [
        Platform::YouTube,
        Platform::TikTok,
        Platform::Instagram,
        Platform::YandexMusic,
        Platform::Search,
    ];

    /// Stable tag used in file names, the log store and metrics labels
    pub fn tag(&self) -> &'static str {
        match self {
            Platform::YandexMusic => "yandexmusic",
            Platform::YouTube => "youtube",
            Platform::TikTok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::Search => "search",
        }
    }

    /// Name shown to users in status messages
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::YandexMusic => "Yandex Music",
            Platform::YouTube => "YouTube",
            Platform::TikTok => "TikTok",
            Platform::Instagram => "Instagram",
            Platform::Search => "Search",
        }
    }

    /// Whether tasks of this platform are delivered as audio
    pub fn is_audio(&self) -> bool {
        matches!(self, Platform::YandexMusic | Platform::Search)
    }

    /// Whether the duration guard is probed before downloading
    pub fn checks_duration(&self) -> bool {
        matches!(self, Platform::YouTube | Platform::Search)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .iter()
            .find(|p| p.tag() == s)
            .copied()
            .ok_or_else(|| format!("unknown platform tag: {}", s))
    }
}
