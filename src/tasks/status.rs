//! Task Status
//!
//! Identity, lifecycle state and progress of scheduled tasks. Progress is
//! written by the running task and read by anyone holding the task's
//! status, without either side blocking the other for long.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Time-ordered task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle: `Waiting -> Running -> Success | Error | Cancelled`.
/// A task cancelled while waiting goes straight to `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Waiting,
    Running,
    Success,
    Error,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        match self {
            TaskState::Waiting | TaskState::Running => false,
            TaskState::Success | TaskState::Error | TaskState::Cancelled => true,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TaskState::Waiting => "WAITING",
            TaskState::Running => "RUNNING",
            TaskState::Success => "SUCCESS",
            TaskState::Error => "ERROR",
            TaskState::Cancelled => "CANCELLED",
        };
        f.write_str(text)
    }
}

/// Monotonic completion fraction in `[0, 1]` plus a description
#[derive(Debug, Default)]
pub struct TaskProgress {
    // non-negative doubles order like their bit patterns
    fraction_bits: AtomicU64,
    text: Mutex<String>,
}

impl TaskProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to `fraction`; smaller values than the current one are ignored
    pub fn set_fraction(&self, fraction: f64) {
        // -0.0 and NaN would compare above every positive bit pattern
        let clamped = if fraction > 0.0 { fraction.min(1.0) } else { 0.0 };
        self.fraction_bits.fetch_max(clamped.to_bits(), Ordering::AcqRel);
    }

    pub fn set_text<S: Into<String>>(&self, text: S) {
        *self.text.lock() = text.into();
    }

    pub fn update<S: Into<String>>(&self, fraction: f64, text: S) {
        self.set_fraction(fraction);
        self.set_text(text);
    }

    pub fn fraction(&self) -> f64 {
        f64::from_bits(self.fraction_bits.load(Ordering::Acquire))
    }

    pub fn text(&self) -> String {
        self.text.lock().clone()
    }
}

/// Point-in-time view of a task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStatus {
    pub id: TaskId,
    pub name: String,
    pub state: TaskState,
    pub fraction: f64,
    pub progress_text: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {:.0}%", self.name, self.state, self.fraction * 100.0)?;
        if !self.progress_text.is_empty() {
            write!(f, " {}", self.progress_text)?;
        }
        Ok(())
    }
}
