//! Aggregate counts over an owner's tasks.

use serde::{Deserialize, Serialize};

use crate::task::{Priority, Task, TaskStatus};

/// Per-status and per-priority task counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    /// Number of tasks.
    pub total: usize,
    /// Tasks with status `completed`.
    pub completed: usize,
    /// Tasks with status `in-progress`.
    pub in_progress: usize,
    /// Tasks with status `todo`.
    pub todo: usize,
    /// Tasks with priority `high`.
    pub high_priority: usize,
    /// Tasks with priority `medium`.
    pub medium_priority: usize,
    /// Tasks with priority `low`.
    pub low_priority: usize,
}

impl TaskStats {
    /// Counts `tasks`. An empty input yields all zeros.
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        tasks.into_iter().fold(Self::default(), |mut stats, task| {
            stats.total += 1;
            match task.status {
                TaskStatus::Todo => stats.todo += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Completed => stats.completed += 1,
            }
            match task.priority {
                Priority::Low => stats.low_priority += 1,
                Priority::Medium => stats.medium_priority += 1,
                Priority::High => stats.high_priority += 1,
            }
            stats
        })
    }
}
