//! Persistence for the download log

pub mod db;
pub mod migrations;

pub use db::{create_pool, get_connection, DbConnection, DbPool, DownloadLog, DownloadStatus, NewDownload};
