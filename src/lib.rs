//! lashmedia: a Telegram bot that fetches media from Yandex Music, YouTube,
//! TikTok and Instagram through yt-dlp.
//!
//! - [`download`] - platform detection, the fetcher and the serial task queue
//! - [`telegram`] - routing, status messages, delivery and the dispatcher schema
//! - [`storage`] - the SQLite download log
//! - [`core`] - configuration, errors, logging, metrics and the dashboard

pub mod cli;
pub mod core;
pub mod download;
pub mod storage;
pub mod telegram;
