//! JSON envelopes exchanged over the REST API.

use serde::{Deserialize, Serialize};

use crate::input::FieldError;
use crate::stats::TaskStats;
use crate::task::{Task, TaskId, TaskStatus};

/// A single task, optionally with an outcome message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    /// Present on mutations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The task.
    pub task: Task,
}

/// `GET /tasks` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    /// Tasks in the requested order.
    pub tasks: Vec<Task>,
    /// `tasks.len()`.
    pub count: usize,
}

impl TaskList {
    /// Wraps a list, filling in `count`.
    #[must_use]
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            count: tasks.len(),
            tasks,
        }
    }
}

/// `GET /tasks/stats` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsEnvelope {
    /// Aggregate counts.
    pub stats: TaskStats,
}

/// `DELETE /tasks/:id` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedEnvelope {
    /// Outcome message.
    #[serde(default)]
    pub message: String,
    /// Id of the removed task.
    pub task_id: TaskId,
}

/// `PATCH /tasks/:id/status` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    /// The new status.
    pub status: TaskStatus,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Summary of the failure.
    pub message: String,
    /// Field-level problems for validation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl ErrorBody {
    /// An error body without field details.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            errors: None,
        }
    }
}

/// `GET /health` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Always `ok` when the server answers.
    pub status: String,
}
