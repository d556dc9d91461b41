//! Task lifecycle against a mocked Bot API and a fake yt-dlp
//!
//! Checks the status message sequence, delivery and the download log entry
//! for each way a task can end.
//!
//! Run with: cargo test --test runner_test

#![cfg(unix)]

mod common;

use pretty_assertions::assert_eq;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;
use teloxide::types::{ChatId, MessageId};
use tempfile::TempDir;
use wiremock::MockServer;

use common::telegram::{bodies, calls, mock_bot, mount_all, mount_error, mount_message, mount_true};
use common::temp_log;
use lashmedia::download::{FetchRequest, FetcherSettings, MediaFetcher, Platform, Task, TaskOutcome, TaskRunner};
use lashmedia::storage::DownloadLog;
use lashmedia::telegram::BotTaskRunner;

const CHAT: i64 = 7;

/// Writes `{template with mp4}` and prints a title, like a successful yt-dlp.
const WRITER_SCRIPT: &str = r#"case "$1" in
  --get-title) echo "Imagine Dragons - Believer"; exit 0;;
esac
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then shift; out=$(echo "$1" | sed 's/%(ext)s/mp4/'); fi
  shift
done
head -c 4096 /dev/zero > "$out""#;

const FAILING_SCRIPT: &str = r#"echo "ERROR: Video unavailable" >&2
exit 1"#;

struct Setup {
    _tool_dir: TempDir,
    out_dir: TempDir,
    _db_dir: TempDir,
    log: DownloadLog,
    runner: BotTaskRunner,
}

fn setup(server: &MockServer, script: &str) -> Setup {
    let tool_dir = tempfile::tempdir().unwrap();
    let bin = tool_dir.path().join("fake-yt-dlp");
    fs::write(&bin, format!("#!/bin/sh\n{}\n", script)).unwrap();
    fs::set_permissions(&bin, fs::Permissions::from_mode(0o755)).unwrap();

    let out_dir = tempfile::tempdir().unwrap();
    let settings = FetcherSettings {
        bin: bin.display().to_string(),
        output_dir: out_dir.path().to_path_buf(),
        cookies_file: out_dir.path().join("missing-cookies.txt"),
        max_file_size_mb: 50,
        max_duration_minutes: 0,
        max_video_height: 1080,
        tool_timeout: Duration::from_secs(10),
        title_timeout: Duration::from_secs(5),
        probe_timeout: Duration::from_secs(5),
    };

    let (db_dir, log) = temp_log();
    let runner = BotTaskRunner::new(mock_bot(server), MediaFetcher::new(settings), log.clone());
    Setup {
        _tool_dir: tool_dir,
        out_dir,
        _db_dir: db_dir,
        log,
        runner,
    }
}

fn video_task() -> Task {
    Task::new(
        CHAT as u64,
        ChatId(CHAT),
        Some(MessageId(10)),
        FetchRequest::new("https://youtu.be/dQw4w9WgXcQ", Platform::YouTube),
    )
}

fn is_empty(dir: &Path) -> bool {
    fs::read_dir(dir).unwrap().next().is_none()
}

async fn logged_statuses(log: &DownloadLog) -> Vec<String> {
    log.stats(10)
        .await
        .unwrap()
        .recent_downloads
        .into_iter()
        .map(|r| r.status)
        .collect()
}

#[tokio::test]
async fn test_success_deletes_status_before_delivery() {
    let server = MockServer::start().await;
    mount_all(&server, CHAT).await;
    let s = setup(&server, WRITER_SCRIPT);

    assert_eq!(s.runner.run(video_task()).await, TaskOutcome::Completed);

    assert_eq!(
        calls(&server).await,
        vec!["sendMessage", "editMessageText", "editMessageText", "deleteMessage", "sendVideo"]
    );
    let edits = bodies(&server, "editMessageText").await;
    assert!(edits[0].contains("Downloading..."));
    assert!(edits[1].contains("Sending 0.0MB..."));

    assert_eq!(logged_statuses(&s.log).await, vec!["completed"]);
    assert!(is_empty(s.out_dir.path()), "delivered file should be removed");
}

#[tokio::test]
async fn test_failure_leaves_error_on_status_message() {
    let server = MockServer::start().await;
    mount_all(&server, CHAT).await;
    let s = setup(&server, FAILING_SCRIPT);

    assert_eq!(s.runner.run(video_task()).await, TaskOutcome::Failed);

    let calls = calls(&server).await;
    assert_eq!(calls, vec!["sendMessage", "editMessageText", "editMessageText"]);
    assert!(!calls.iter().any(|c| c == "deleteMessage"));

    let edits = bodies(&server, "editMessageText").await;
    assert!(edits[1].contains("Error: Download failed: Video unavailable"));
    assert_eq!(logged_statuses(&s.log).await, vec!["failed"]);
}

#[tokio::test]
async fn test_status_updates_are_skipped_when_first_send_fails() {
    let server = MockServer::start().await;
    mount_error(&server, "sendMessage", 400, "Bad Request: not enough rights to send text messages").await;
    mount_message(&server, "sendVideo", CHAT).await;
    let s = setup(&server, WRITER_SCRIPT);

    assert_eq!(s.runner.run(video_task()).await, TaskOutcome::Completed);

    // Threaded send, then the plain fallback, then straight to delivery
    assert_eq!(calls(&server).await, vec!["sendMessage", "sendMessage", "sendVideo"]);
    assert_eq!(logged_statuses(&s.log).await, vec!["completed"]);
}

#[tokio::test]
async fn test_closed_destination_counts_as_completed() {
    let server = MockServer::start().await;
    mount_message(&server, "sendMessage", CHAT).await;
    mount_message(&server, "editMessageText", CHAT).await;
    mount_true(&server, "deleteMessage").await;
    mount_error(&server, "sendVideo", 403, "Forbidden: bot was blocked by the user").await;
    let s = setup(&server, WRITER_SCRIPT);

    assert_eq!(s.runner.run(video_task()).await, TaskOutcome::Completed);

    // No error message follows the rejected upload
    assert_eq!(bodies(&server, "sendMessage").await.len(), 1);
    assert_eq!(logged_statuses(&s.log).await, vec!["completed"]);
    assert!(is_empty(s.out_dir.path()));
}

#[tokio::test]
async fn test_upload_error_is_reported_and_logged_as_failed() {
    let server = MockServer::start().await;
    mount_message(&server, "sendMessage", CHAT).await;
    mount_message(&server, "editMessageText", CHAT).await;
    mount_true(&server, "deleteMessage").await;
    mount_error(&server, "sendVideo", 400, "Bad Request: wrong file identifier/HTTP URL specified").await;
    let s = setup(&server, WRITER_SCRIPT);

    assert_eq!(s.runner.run(video_task()).await, TaskOutcome::Failed);

    let sent = bodies(&server, "sendMessage").await;
    assert_eq!(sent.len(), 2);
    assert!(sent[1].contains("Error: failed to send the file"));
    assert_eq!(logged_statuses(&s.log).await, vec!["failed"]);
}
