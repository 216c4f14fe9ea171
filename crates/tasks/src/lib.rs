use chrono::{DateTime, Local};
use kindshell_core::{Action, DirEntryInfo, FailureReason};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod scheduler;
pub mod trigger_time;

pub use scheduler::{SchedulerConfig, TaskScheduler};
pub use trigger_time::parse_trigger_time;

pub type TaskId = u64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("Invalid time: '{0}'")]
    InvalidTime(String),
    #[error("Task not found: #{0}")]
    NotFound(TaskId),
    #[error("Task #{0} is already {1}")]
    NotPending(TaskId, TaskStatus),
    /// Finished long enough ago that it has left the history.
    #[error("Task #{0} has already finished")]
    Finished(TaskId),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum TaskStatus {
    Pending,
    Fired,
    Completed,
    Failed(FailureReason),
    Cancelled,
}

impl TaskStatus {
    /// Completed, Failed and Cancelled never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed(_) | TaskStatus::Cancelled
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => f.write_str("pending"),
            TaskStatus::Fired => f.write_str("running"),
            TaskStatus::Completed => f.write_str("completed"),
            TaskStatus::Failed(reason) => write!(f, "failed ({})", reason),
            TaskStatus::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// An action waiting for (or done with) its trigger time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledTask {
    /// Also the registration order: lower ids were scheduled earlier.
    pub id: TaskId,
    pub action: Action,
    pub trigger_at: DateTime<Local>,
    pub registered_at: DateTime<Local>,
    pub status: TaskStatus,
    pub finished_at: Option<DateTime<Local>>,
    pub summary: Option<String>,
    /// Directory listing produced by a `list files` task.
    pub entries: Vec<DirEntryInfo>,
}

impl fmt::Display for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} at {} [{}]",
            self.id,
            self.action,
            self.trigger_at.format("%Y-%m-%d %H:%M:%S"),
            self.status
        )
    }
}
