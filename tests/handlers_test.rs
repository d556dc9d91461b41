//! Real handler tree against a mocked Bot API
//!
//! Updates are dispatched through `schema()` exactly as the dispatcher does,
//! and the replies are read back from the mock server.
//!
//! Run with: cargo test --test handlers_test

mod common;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use teloxide::dptree;
use teloxide::types::Update;
use wiremock::MockServer;

use common::telegram::{bodies, calls, me, mock_bot, mount_all, picker_press, private_text, BOT_USERNAME};
use common::wait_until;
use lashmedia::core::CooldownGate;
use lashmedia::download::{QueueLimits, Task, TaskOutcome, TaskQueue, TaskRunner};
use lashmedia::telegram::handlers::{PendingPick, PICK_EXPIRED_TEXT, PICK_NOT_YOURS_TEXT};
use lashmedia::telegram::router::RouterSettings;
use lashmedia::telegram::{schema, Bot, HandlerDeps};

/// Runner whose tasks never finish, so everything admitted stays outstanding.
#[derive(Default)]
struct StuckRunner {
    started: Mutex<Vec<(u64, Option<String>)>>,
}

impl StuckRunner {
    fn started(&self) -> Vec<(u64, Option<String>)> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskRunner for StuckRunner {
    async fn run(&self, task: Task) -> TaskOutcome {
        self.started
            .lock()
            .unwrap()
            .push((task.user_id, task.request.item_id.clone()));
        std::future::pending().await
    }
}

struct Harness {
    server: MockServer,
    bot: Bot,
    deps: HandlerDeps,
    runner: Arc<StuckRunner>,
}

impl Harness {
    async fn new(chat_id: i64) -> Self {
        let server = MockServer::start().await;
        mount_all(&server, chat_id).await;

        let runner = Arc::new(StuckRunner::default());
        let queue = TaskQueue::start(
            runner.clone(),
            QueueLimits {
                max_queue_size: 10,
                max_per_user: 2,
            },
        );
        let deps = HandlerDeps::new(
            queue,
            CooldownGate::new(Duration::from_secs(30), 1_000),
            RouterSettings::new(BOT_USERNAME, "!"),
            "yt-dlp".into(),
            false,
        );

        Self {
            bot: mock_bot(&server),
            server,
            deps,
            runner,
        }
    }

    async fn dispatch(&self, update: Update) {
        let flow = schema(self.deps.clone())
            .dispatch(dptree::deps![self.bot.clone(), me(), update])
            .await;
        assert!(matches!(flow, ControlFlow::Break(Ok(()))), "update was not handled cleanly");
    }
}

#[tokio::test]
async fn test_first_search_starts_silently_then_cooldown_reply() {
    let h = Harness::new(7).await;

    h.dispatch(private_text(1, 10, 7, "imagine dragons believer")).await;
    assert!(calls(&h.server).await.is_empty());
    wait_until(|| h.runner.started().len() == 1).await;

    h.dispatch(private_text(2, 11, 7, "thunder")).await;
    let sent = bodies(&h.server, "sendMessage").await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("Wait "), "expected a cooldown reply, got {}", sent[0]);
    assert_eq!(h.deps.queue.snapshot().await.outstanding(), 1);
}

#[tokio::test]
async fn test_second_user_gets_queue_position() {
    let h = Harness::new(8).await;

    h.dispatch(private_text(1, 10, 7, "believer")).await;
    h.dispatch(private_text(2, 20, 8, "https://youtu.be/dQw4w9WgXcQ")).await;

    let sent = bodies(&h.server, "sendMessage").await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("Added to queue. Position: 1. Please wait..."));
    assert_eq!(h.deps.queue.snapshot().await.outstanding(), 2);
}

#[tokio::test]
async fn test_unsupported_link_in_private() {
    let h = Harness::new(7).await;

    h.dispatch(private_text(1, 10, 7, "https://example.com/clip.mp4")).await;

    let sent = bodies(&h.server, "sendMessage").await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("Unsupported platform"));
    assert_eq!(h.deps.queue.snapshot().await.outstanding(), 0);
}

#[tokio::test]
async fn test_picker_press_queues_once_for_its_requester() {
    let chat_id = -100123;
    let h = Harness::new(chat_id).await;
    h.deps.pending_picks.insert(
        (chat_id, 50),
        PendingPick {
            requester: 7,
            query: "believer".into(),
        },
    );

    h.dispatch(picker_press(1, chat_id, 50, 8, "7wtfhZwyrcc")).await;
    h.dispatch(picker_press(2, chat_id, 50, 7, "7wtfhZwyrcc")).await;
    h.dispatch(picker_press(3, chat_id, 50, 7, "7wtfhZwyrcc")).await;

    wait_until(|| h.runner.started().len() == 1).await;
    assert_eq!(h.deps.queue.snapshot().await.outstanding(), 1);
    assert_eq!(h.runner.started(), vec![(7, Some("7wtfhZwyrcc".to_string()))]);

    let answers = bodies(&h.server, "answerCallbackQuery").await;
    assert_eq!(answers.len(), 3);
    assert!(answers[0].contains(PICK_NOT_YOURS_TEXT));
    assert!(!answers[1].contains(PICK_NOT_YOURS_TEXT) && !answers[1].contains(PICK_EXPIRED_TEXT));
    assert!(answers[2].contains(PICK_EXPIRED_TEXT));

    // Only the claimed press removes the keyboard
    assert_eq!(bodies(&h.server, "deleteMessage").await.len(), 1);
    // Presses never touch the cooldown gate
    assert_eq!(h.deps.cooldown.tracked_users(), 0);
}

#[tokio::test]
async fn test_picker_press_after_expiry_queues_nothing() {
    let chat_id = -100123;
    let h = Harness::new(chat_id).await;

    h.dispatch(picker_press(1, chat_id, 50, 7, "7wtfhZwyrcc")).await;

    let answers = bodies(&h.server, "answerCallbackQuery").await;
    assert_eq!(answers.len(), 1);
    assert!(answers[0].contains(PICK_EXPIRED_TEXT));
    assert!(bodies(&h.server, "deleteMessage").await.is_empty());
    assert_eq!(h.deps.queue.snapshot().await.outstanding(), 0);
}
