//! Task Scheduling
//!
//! Concurrent execution of independent verification tasks with per-task
//! state, progress and cooperative cancellation.

pub mod error;
pub mod scheduler;
pub mod status;

pub use error::{TaskError, TaskResult};
pub use scheduler::{SchedulerStats, Task, TaskContext, TaskHandle, TaskListener, TaskScheduler};
pub use status::{TaskId, TaskProgress, TaskState, TaskStatus};

#[cfg(test)]
mod tests;
