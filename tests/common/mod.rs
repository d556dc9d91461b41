//! Common test utilities
//!
//! Shared across the integration tests in this directory.

#![allow(dead_code)]

pub mod telegram;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use teloxide::types::ChatId;
use tempfile::TempDir;

use lashmedia::download::{FetchError, FetchRequest, Platform, Task, TaskOutcome, TaskRunner};
use lashmedia::storage::{create_pool, DownloadLog};

/// Runner that records what it ran and how many ran at once.
///
/// Each run sleeps for `work` so overlapping runs would be visible.
pub struct RecordingRunner {
    pub order: Mutex<Vec<String>>,
    pub running: AtomicUsize,
    pub max_running: AtomicUsize,
    pub finished: AtomicUsize,
    work: Duration,
    fail_inputs: Vec<String>,
}

impl RecordingRunner {
    pub fn new(work: Duration) -> Arc<Self> {
        Self::failing_on(work, &[])
    }

    /// Same, but tasks whose input is listed end as `FileNotFound` failures.
    pub fn failing_on(work: Duration, inputs: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            order: Mutex::new(Vec::new()),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
            work,
            fail_inputs: inputs.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn order(&self) -> Vec<String> {
        self.order.lock().unwrap().clone()
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskRunner for RecordingRunner {
    async fn run(&self, task: Task) -> TaskOutcome {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
        self.order.lock().unwrap().push(task.request.input.clone());

        tokio::time::sleep(self.work).await;

        let outcome = if self.fail_inputs.contains(&task.request.input) {
            let err = FetchError::FileNotFound;
            assert_eq!(err.user_message(), "File not found");
            TaskOutcome::Failed
        } else {
            TaskOutcome::Completed
        };

        self.running.fetch_sub(1, Ordering::SeqCst);
        self.finished.fetch_add(1, Ordering::SeqCst);
        outcome
    }
}

pub fn search_task(user_id: u64, query: &str) -> Task {
    Task::new(
        user_id,
        ChatId(user_id as i64),
        None,
        FetchRequest::new(query, Platform::Search),
    )
}

/// Polls `condition` every 5ms for up to 5 seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 5s");
}

/// A migrated download log in a scratch directory.
pub fn temp_log() -> (TempDir, DownloadLog) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("downloads.sqlite");
    let pool = create_pool(path.to_str().unwrap()).unwrap();
    (dir, DownloadLog::new(pool))
}
