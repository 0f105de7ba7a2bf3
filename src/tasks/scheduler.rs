//! Task Scheduler
//!
//! Runs blocking tasks on a bounded number of workers. Each task gets a
//! child of the scheduler's cancellation token and a progress record;
//! cancellation is cooperative and only observed where the task polls it.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::error::{TaskError, TaskResult};
use super::status::{TaskId, TaskProgress, TaskState, TaskStatus};

/// A unit of blocking work
pub trait Task: Send + 'static {
    type Output: Send + 'static;

    /// Presentable name shown in statuses and logs
    fn name(&self) -> String;

    fn execute(self, context: &TaskContext) -> TaskResult<Self::Output>;
}

/// What a running task can see of its own record
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub id: TaskId,
    progress: Arc<TaskProgress>,
    cancellation: CancellationToken,
}

impl TaskContext {
    /// A standalone context, for running task bodies outside a scheduler
    pub fn detached(cancellation: CancellationToken) -> Self {
        Self {
            id: TaskId::new(),
            progress: Arc::new(TaskProgress::new()),
            cancellation,
        }
    }

    pub fn progress(&self) -> &TaskProgress {
        &self.progress
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn check_cancelled(&self) -> TaskResult<()> {
        if self.is_cancelled() {
            Err(TaskError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Notified once per task when it reaches a terminal state
pub trait TaskListener: Send + Sync {
    fn on_completed(&self, status: &TaskStatus);
}

#[derive(Debug)]
struct Lifecycle {
    state: TaskState,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    error: Option<String>,
}

#[derive(Debug)]
struct TaskRecord {
    id: TaskId,
    name: String,
    created_at: DateTime<Utc>,
    progress: Arc<TaskProgress>,
    cancellation: CancellationToken,
    lifecycle: Mutex<Lifecycle>,
}

impl TaskRecord {
    fn new(name: String, cancellation: CancellationToken) -> Self {
        Self {
            id: TaskId::new(),
            name,
            created_at: Utc::now(),
            progress: Arc::new(TaskProgress::new()),
            cancellation,
            lifecycle: Mutex::new(Lifecycle {
                state: TaskState::Waiting,
                started_at: None,
                finished_at: None,
                error: None,
            }),
        }
    }

    fn start(&self) {
        let mut lifecycle = self.lifecycle.lock();
        lifecycle.state = TaskState::Running;
        lifecycle.started_at = Some(Utc::now());
    }

    fn finish(&self, state: TaskState, error: Option<String>) {
        let mut lifecycle = self.lifecycle.lock();
        lifecycle.state = state;
        lifecycle.finished_at = Some(Utc::now());
        lifecycle.error = error;
    }

    fn status(&self) -> TaskStatus {
        let lifecycle = self.lifecycle.lock();
        TaskStatus {
            id: self.id,
            name: self.name.clone(),
            state: lifecycle.state,
            fraction: self.progress.fraction(),
            progress_text: self.progress.text(),
            created_at: self.created_at,
            started_at: lifecycle.started_at,
            finished_at: lifecycle.finished_at,
            error: lifecycle.error.clone(),
        }
    }

    fn context(&self) -> TaskContext {
        TaskContext {
            id: self.id,
            progress: Arc::clone(&self.progress),
            cancellation: self.cancellation.clone(),
        }
    }
}

/// Aggregate counters
#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

/// Snapshot of the scheduler counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl SchedulerStats {
    pub fn finished(&self) -> u64 {
        self.succeeded + self.failed + self.cancelled
    }
}

struct Shared {
    records: DashMap<TaskId, Arc<TaskRecord>>,
    listeners: RwLock<Vec<Arc<dyn TaskListener>>>,
    counters: Counters,
}

impl Shared {
    fn complete<O>(&self, record: &TaskRecord, outcome: &TaskResult<O>) {
        let (state, error) = match outcome {
            Ok(_) => {
                self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
                (TaskState::Success, None)
            }
            Err(TaskError::Cancelled) => {
                self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
                (TaskState::Cancelled, None)
            }
            Err(e @ (TaskError::Failed { .. } | TaskError::Panicked { .. } | TaskError::SchedulerClosed)) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!("Task '{}' failed: {}", record.name, e);
                (TaskState::Error, Some(e.to_string()))
            }
        };
        record.finish(state, error);
        debug!("Task '{}' ({}) finished: {}", record.name, record.id, state);

        let status = record.status();
        let listeners: Vec<Arc<dyn TaskListener>> = self.listeners.read().clone();
        for listener in listeners {
            listener.on_completed(&status);
        }
    }
}

/// Bounded pool of blocking workers with cooperative cancellation
#[derive(Clone)]
pub struct TaskScheduler {
    workers: usize,
    semaphore: Arc<Semaphore>,
    cancellation: CancellationToken,
    shared: Arc<Shared>,
}

impl TaskScheduler {
    /// Scheduler running at most `workers` tasks at once (at least one)
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        info!("Task scheduler started with {} workers", workers);
        Self {
            workers,
            semaphore: Arc::new(Semaphore::new(workers)),
            cancellation: CancellationToken::new(),
            shared: Arc::new(Shared {
                records: DashMap::new(),
                listeners: RwLock::new(Vec::new()),
                counters: Counters::default(),
            }),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn add_listener(&self, listener: Arc<dyn TaskListener>) {
        self.shared.listeners.write().push(listener);
    }

    /// Queue a task. Must be called from within a tokio runtime.
    pub fn submit<T: Task>(&self, task: T) -> TaskHandle<T::Output> {
        let record = Arc::new(TaskRecord::new(task.name(), self.cancellation.child_token()));
        self.shared.records.insert(record.id, Arc::clone(&record));
        self.shared.counters.submitted.fetch_add(1, Ordering::Relaxed);
        debug!("Task '{}' ({}) submitted", record.name, record.id);

        let semaphore = Arc::clone(&self.semaphore);
        let shared = Arc::clone(&self.shared);
        let task_record = Arc::clone(&record);
        let join = tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = task_record.cancellation.cancelled() => Err(TaskError::Cancelled),
                permit = semaphore.acquire_owned() => match permit {
                    Ok(permit) => {
                        let outcome = run(task, &task_record).await;
                        drop(permit);
                        outcome
                    }
                    Err(_) => Err(TaskError::SchedulerClosed),
                },
            };
            shared.complete(&task_record, &outcome);
            outcome
        });

        TaskHandle {
            record,
            join,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Cancel every submitted task, including ones submitted later
    pub fn cancel_all(&self) {
        info!("Cancelling all tasks");
        self.cancellation.cancel();
    }

    /// Statuses of tasks whose result has not been collected, oldest first
    pub fn statuses(&self) -> Vec<TaskStatus> {
        let mut statuses: Vec<TaskStatus> = self.shared.records.iter().map(|r| r.status()).collect();
        statuses.sort_by_key(|s| (s.created_at, s.id));
        statuses
    }

    pub fn status(&self, id: &TaskId) -> Option<TaskStatus> {
        self.shared.records.get(id).map(|r| r.status())
    }

    pub fn stats(&self) -> SchedulerStats {
        let counters = &self.shared.counters;
        SchedulerStats {
            submitted: counters.submitted.load(Ordering::Relaxed),
            succeeded: counters.succeeded.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            cancelled: counters.cancelled.load(Ordering::Relaxed),
        }
    }
}

async fn run<T: Task>(task: T, record: &Arc<TaskRecord>) -> TaskResult<T::Output> {
    // a permit can be granted after cancellation; never start in that case
    if record.cancellation.is_cancelled() {
        return Err(TaskError::Cancelled);
    }
    record.start();
    let context = record.context();
    let result = tokio::task::spawn_blocking(move || task.execute(&context)).await;

    let cancelled = record.cancellation.is_cancelled();
    match result {
        Ok(_) if cancelled => Err(TaskError::Cancelled),
        Ok(outcome) => outcome,
        Err(join_error) => Err(TaskError::from(join_error)),
    }
}

/// Caller's side of a submitted task
pub struct TaskHandle<O> {
    record: Arc<TaskRecord>,
    join: JoinHandle<TaskResult<O>>,
    shared: Arc<Shared>,
}

impl<O> TaskHandle<O> {
    pub fn id(&self) -> TaskId {
        self.record.id
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn status(&self) -> TaskStatus {
        self.record.status()
    }

    /// Request cooperative cancellation
    pub fn cancel(&self) {
        self.record.cancellation.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the result and drop the task's record from the scheduler
    pub async fn join(self) -> TaskResult<O> {
        let outcome = match self.join.await {
            Ok(outcome) => outcome,
            Err(join_error) => Err(TaskError::from(join_error)),
        };
        self.shared.records.remove(&self.record.id);
        outcome
    }
}
