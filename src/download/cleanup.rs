//! Periodic removal of stale files left in the output directory
//!
//! Downloads are deleted after delivery, but a crash or a failed upload can
//! leave files behind. Only names carrying one of our platform prefixes are
//! touched, so a shared temp dir is safe.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::core::config;
use crate::download::platform::Platform;

/// Whether `name` looks like something the fetcher wrote (`{tag}_...`).
pub fn is_our_file(name: &str) -> bool {
    Platform::ALL
        .iter()
        .any(|p| name.strip_prefix(p.tag()).is_some_and(|rest| rest.starts_with('_')))
}

/// Deletes our files in `dir` last modified more than `max_age` before `now`.
///
/// Returns how many files were removed. Errors on single entries are logged
/// and skipped.
pub fn sweep_dir(dir: &Path, max_age: Duration, now: SystemTime) -> std::io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };

        let name = entry.file_name();
        if !is_our_file(&name.to_string_lossy()) {
            continue;
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                log::warn!("Cannot stat {}: {}", entry.path().display(), e);
                continue;
            }
        };

        let age = now.duration_since(modified).unwrap_or_default();
        if age > max_age {
            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    log::info!("Removed stale file {}", entry.path().display());
                    removed += 1;
                }
                Err(e) => log::warn!("Failed to remove {}: {}", entry.path().display(), e),
            }
        }
    }
    Ok(removed)
}

/// Runs [`sweep_dir`] on `dir` every `cleanup::INTERVAL_SECS`, starting now.
pub async fn run_sweeper(dir: PathBuf) {
    let mut ticker = tokio::time::interval(config::cleanup::interval());
    loop {
        ticker.tick().await;
        let target = dir.clone();
        let result = tokio::task::spawn_blocking(move || {
            sweep_dir(&target, config::cleanup::max_age(), SystemTime::now())
        })
        .await;

        match result {
            Ok(Ok(0)) => log::debug!("Temp sweep: nothing to remove in {}", dir.display()),
            Ok(Ok(n)) => log::info!("Temp sweep: removed {} file(s) from {}", n, dir.display()),
            Ok(Err(e)) => log::error!("Temp sweep of {} failed: {}", dir.display(), e),
            Err(e) => log::error!("Temp sweep task failed: {}", e),
        }
    }
}
