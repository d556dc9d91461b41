//! Serial download queue
//!
//! A single worker task owns the FIFO and the one in-flight slot. Callers
//! talk to it through [`TaskQueue`], a cheap clonable handle that sends
//! commands over an mpsc channel and gets answers back on oneshot channels.
//! Admission (caps, position) is decided inside the worker, so it is
//! consistent with the queue state without any lock.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use teloxide::types::{ChatId, MessageId};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};

use crate::core::config;
use crate::core::metrics;
use crate::download::fetcher::FetchRequest;

/// Identifier assigned by the queue on admission
pub type TaskId = u64;

/// One user request waiting for (or undergoing) a fetch
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub user_id: u64,
    pub chat_id: ChatId,
    /// Message the status and result are threaded under
    pub reply_to: Option<MessageId>,
    pub request: FetchRequest,
}

impl Task {
    pub fn new(user_id: u64, chat_id: ChatId, reply_to: Option<MessageId>, request: FetchRequest) -> Self {
        Self {
            id: 0,
            user_id,
            chat_id,
            reply_to,
            request,
        }
    }
}

/// How a task ended, as reported by the runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Failed,
}

/// Executes one task end to end (fetch, report, deliver, log).
///
/// Implementations must not return before delivery is finished: the queue
/// starts the next task as soon as `run` returns.
#[async_trait]
pub trait TaskRunner: Send + Sync + 'static {
    async fn run(&self, task: Task) -> TaskOutcome;
}

/// Admission caps. A limit of 0 disables that check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueLimits {
    /// Outstanding tasks overall (waiting + in flight)
    pub max_queue_size: usize,
    /// Outstanding tasks of a single user (waiting + in flight)
    pub max_per_user: usize,
}

impl QueueLimits {
    pub fn from_env() -> Self {
        Self {
            max_queue_size: *config::queue::MAX_QUEUE_SIZE,
            max_per_user: *config::queue::MAX_TASKS_PER_USER,
        }
    }
}

/// Successful admission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Nothing was running; the task started right away
    Started { id: TaskId },
    /// The task waits behind `position` others (the in-flight one included)
    Queued { id: TaskId, position: usize },
}

impl Admission {
    pub fn id(&self) -> TaskId {
        match self {
            Admission::Started { id } | Admission::Queued { id, .. } => *id,
        }
    }
}

/// Why a task was not admitted. Display text is shown to the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("Queue is full ({limit} tasks). Please try again later.")]
    QueueFull { limit: usize },

    #[error("You already have {limit} requests in the queue. Please wait for them to finish.")]
    UserCapReached { limit: usize },

    #[error("The download queue is shutting down. Please try again later.")]
    Closed,
}

impl AdmissionError {
    /// Label for the admissions metric
    pub fn outcome(&self) -> &'static str {
        match self {
            AdmissionError::QueueFull { .. } => "queue_full",
            AdmissionError::UserCapReached { .. } => "user_cap",
            AdmissionError::Closed => "closed",
        }
    }
}

/// Point-in-time view of the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueSnapshot {
    /// Tasks waiting (not counting the in-flight one)
    pub pending: usize,
    pub in_flight: bool,
}

impl QueueSnapshot {
    pub fn outstanding(&self) -> usize {
        self.pending + usize::from(self.in_flight)
    }
}

enum QueueCommand {
    Enqueue {
        task: Task,
        reply: oneshot::Sender<Result<Admission, AdmissionError>>,
    },
    Snapshot {
        reply: oneshot::Sender<QueueSnapshot>,
    },
}

/// Handle to the queue worker
#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::Sender<QueueCommand>,
}

impl TaskQueue {
    /// Spawns the worker on the current tokio runtime and returns a handle.
    ///
    /// The worker stops once every handle is dropped; an in-flight task is
    /// left to finish on its own.
    pub fn start(runner: Arc<dyn TaskRunner>, limits: QueueLimits) -> Self {
        let (tx, rx) = mpsc::channel(config::queue::COMMAND_BUFFER);
        let worker = Worker {
            runner,
            limits,
            pending: VecDeque::new(),
            in_flight: None,
            next_id: 1,
        };
        tokio::spawn(worker.run(rx));
        Self { tx }
    }

    /// Submits a task. Caps are checked before anything is queued.
    pub async fn enqueue(&self, task: Task) -> Result<Admission, AdmissionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(QueueCommand::Enqueue { task, reply })
            .await
            .map_err(|_| AdmissionError::Closed)?;
        rx.await.map_err(|_| AdmissionError::Closed)?
    }

    /// Current queue state; an empty snapshot if the worker is gone.
    pub async fn snapshot(&self) -> QueueSnapshot {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(QueueCommand::Snapshot { reply }).await.is_err() {
            return QueueSnapshot::default();
        }
        rx.await.unwrap_or_default()
    }
}

struct InFlight {
    task_id: TaskId,
    user_id: u64,
    handle: JoinHandle<TaskOutcome>,
}

struct Worker {
    runner: Arc<dyn TaskRunner>,
    limits: QueueLimits,
    pending: VecDeque<Task>,
    in_flight: Option<InFlight>,
    next_id: TaskId,
}

/// Waits for the in-flight task; never resolves when the slot is empty.
async fn join_in_flight(slot: &mut Option<InFlight>) -> (TaskId, Result<TaskOutcome, JoinError>) {
    match slot {
        Some(in_flight) => {
            let result = (&mut in_flight.handle).await;
            (in_flight.task_id, result)
        }
        None => std::future::pending().await,
    }
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::Receiver<QueueCommand>) {
        log::info!(
            "Download queue started (max {} tasks, {} per user)",
            self.limits.max_queue_size,
            self.limits.max_per_user
        );

        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                (task_id, result) = join_in_flight(&mut self.in_flight), if self.in_flight.is_some() => {
                    self.in_flight = None;
                    match result {
                        Ok(outcome) => log::info!("Task {} finished: {:?}", task_id, outcome),
                        Err(e) => log::error!("Task {} aborted: {}", task_id, e),
                    }
                    self.start_next();
                }
            }
        }

        log::info!("Download queue stopped ({} task(s) dropped)", self.pending.len());
    }

    fn handle(&mut self, command: QueueCommand) {
        match command {
            QueueCommand::Enqueue { task, reply } => {
                let result = self.admit(task);
                match &result {
                    Ok(Admission::Started { .. }) => metrics::record_admission("started"),
                    Ok(Admission::Queued { .. }) => metrics::record_admission("queued"),
                    Err(e) => metrics::record_admission(e.outcome()),
                }
                // The caller may have gone away; the task stays queued regardless.
                let _ = reply.send(result);
            }
            QueueCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            pending: self.pending.len(),
            in_flight: self.in_flight.is_some(),
        }
    }

    fn outstanding_for(&self, user_id: u64) -> usize {
        let waiting = self.pending.iter().filter(|t| t.user_id == user_id).count();
        let running = self.in_flight.as_ref().is_some_and(|f| f.user_id == user_id);
        waiting + usize::from(running)
    }

    fn admit(&mut self, mut task: Task) -> Result<Admission, AdmissionError> {
        let outstanding = self.snapshot().outstanding();

        let limit = self.limits.max_queue_size;
        if limit > 0 && outstanding >= limit {
            log::warn!("Queue full ({}), rejecting task of user {}", outstanding, task.user_id);
            return Err(AdmissionError::QueueFull { limit });
        }

        let limit = self.limits.max_per_user;
        if limit > 0 && self.outstanding_for(task.user_id) >= limit {
            log::info!("User {} reached the per-user cap ({})", task.user_id, limit);
            return Err(AdmissionError::UserCapReached { limit });
        }

        task.id = self.next_id;
        self.next_id += 1;
        let id = task.id;

        self.pending.push_back(task);
        if self.in_flight.is_none() {
            self.start_next();
        }

        if self.in_flight.as_ref().is_some_and(|f| f.task_id == id) {
            log::info!("Task {} started immediately", id);
            Ok(Admission::Started { id })
        } else {
            log::info!("Task {} queued at position {}", id, outstanding);
            self.update_gauges();
            Ok(Admission::Queued {
                id,
                position: outstanding,
            })
        }
    }

    fn start_next(&mut self) {
        if self.in_flight.is_none() {
            if let Some(task) = self.pending.pop_front() {
                let runner = Arc::clone(&self.runner);
                let task_id = task.id;
                let user_id = task.user_id;
                log::info!(
                    "Starting task {} ({} for user {}), {} waiting",
                    task_id,
                    task.request.platform,
                    user_id,
                    self.pending.len()
                );
                let handle = tokio::spawn(async move { runner.run(task).await });
                self.in_flight = Some(InFlight {
                    task_id,
                    user_id,
                    handle,
                });
            }
        }
        self.update_gauges();
    }

    fn update_gauges(&self) {
        metrics::QUEUE_DEPTH.set(self.pending.len() as i64);
        metrics::TASKS_IN_FLIGHT.set(i64::from(self.in_flight.is_some()));
    }
}
