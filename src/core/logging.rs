//! Logging initialization and startup diagnostics
//!
//! - Logger initialization (console + file)
//! - Tool/cookie configuration report at startup

use anyhow::Result;
use simplelog::*;
use std::fs::OpenOptions;

use crate::core::config;

/// Initialize logger for both console and file output
///
/// The file is appended to, so restarts keep the previous history.
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .map_err(|e| anyhow::anyhow!("Failed to open log file {}: {}", log_file_path, e))?;

    let term_config = ConfigBuilder::new()
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("reqwest")
        .build();

    CombinedLogger::init(vec![
        TermLogger::new(LevelFilter::Info, term_config, TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs which external tools and optional files the bot will use.
pub fn log_startup_configuration() {
    log::info!("yt-dlp binary: {}", *config::YTDL_BIN);
    log::info!("Download dir: {}", config::DOWNLOAD_DIR.display());

    let cookies = &*config::MUSIC_COOKIES_FILE;
    if cookies.exists() {
        log::info!("Music cookies: {} (will be used for Yandex Music)", cookies.display());
    } else {
        log::warn!(
            "Music cookies: {} not found, Yandex Music may refuse some tracks",
            cookies.display()
        );
    }

    log::info!(
        "Limits: cooldown {}s, queue {}, per user {}, file {}MB, duration {}min",
        *config::cooldown::COOLDOWN_SECONDS,
        *config::queue::MAX_QUEUE_SIZE,
        *config::queue::MAX_TASKS_PER_USER,
        *config::download::MAX_FILE_SIZE_MB,
        *config::download::MAX_DURATION_MINUTES,
    );

    if *config::SEARCH_PICKER {
        log::info!("Search picker enabled");
    }
}
