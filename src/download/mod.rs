//! Media acquisition: platform detection, yt-dlp fetching and the serial queue

pub mod cleanup;
pub mod error;
pub mod fetcher;
pub mod platform;
pub mod queue;
pub mod ytdlp;

pub use error::FetchError;
pub use fetcher::{FetchRequest, FetchedMedia, FetcherSettings, MediaFetcher};
pub use platform::{detect, Platform};
pub use queue::{Admission, AdmissionError, QueueLimits, Task, TaskOutcome, TaskQueue, TaskRunner};
