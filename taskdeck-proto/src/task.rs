//! Task model for Taskdeck.
//!
//! A [`Task`] is owned by exactly one user for its whole lifetime. The
//! completion fields (`is_completed`, `completed_at`) are redundant with
//! `status` and are only ever written through [`derive_completion`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::input::{NewTask, TaskPatch};

/// Maximum task title length in characters (after trimming).
pub const MAX_TITLE_LENGTH: usize = 100;

/// Maximum task description length in characters (after trimming).
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Unique identifier for a task, based on UUID v7 for time-ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new time-ordered task identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `TaskId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Identifier of a user account. Tasks reference their owner by this id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new user identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `UserId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A string did not name any variant of a task enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized {kind}: {value}")]
pub struct UnknownVariant {
    /// Which enumeration was being parsed (`status`, `priority`, ...).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Workflow status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Not started.
    #[default]
    Todo,
    /// Actively being worked on.
    InProgress,
    /// Finished.
    Completed,
}

impl TaskStatus {
    /// All statuses in workflow order.
    pub const ALL: [Self; 3] = [Self::Todo, Self::InProgress, Self::Completed];

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "status",
                value: s.to_string(),
            })
    }
}

/// Priority of a task. Ordered `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Can wait.
    Low,
    /// Normal.
    #[default]
    Medium,
    /// Needs attention first.
    High,
}

impl Priority {
    /// All priorities from lowest to highest.
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Wire name of the priority.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "priority",
                value: s.to_string(),
            })
    }
}

/// The completion fields implied by a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// `true` iff the status is [`TaskStatus::Completed`].
    pub is_completed: bool,
    /// When the task entered the completed state, `None` otherwise.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Computes the completion fields for `status`.
///
/// `previous` is the task's current `completed_at`. A task that stays
/// completed keeps its original completion time; a task entering the
/// completed state is stamped with `now`; any other status clears it.
#[must_use]
pub fn derive_completion(
    status: TaskStatus,
    previous: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Completion {
    match status {
        TaskStatus::Completed => Completion {
            is_completed: true,
            completed_at: Some(previous.unwrap_or(now)),
        },
        TaskStatus::Todo | TaskStatus::InProgress => Completion {
            is_completed: false,
            completed_at: None,
        },
    }
}

/// A personal task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task identifier (UUID v7, time-ordered).
    pub id: TaskId,
    /// Account that owns the task. Never changes after creation.
    pub owner_id: UserId,
    /// Trimmed, non-empty title.
    pub title: String,
    /// Trimmed description, possibly empty.
    pub description: String,
    /// Workflow status.
    pub status: TaskStatus,
    /// Priority.
    pub priority: Priority,
    /// Deadline, if any.
    pub due_date: Option<DateTime<Utc>>,
    /// Labels in the order given by the owner.
    pub tags: Vec<String>,
    /// Mirrors `status == Completed`.
    pub is_completed: bool,
    /// Set while the task is completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// Creation time, set by the store.
    pub created_at: DateTime<Utc>,
    /// Time of the last successful write, set by the store.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Builds a new task owned by `owner` from validated creation input.
    #[must_use]
    pub fn create(owner: UserId, input: NewTask, now: DateTime<Utc>) -> Self {
        let completion = derive_completion(input.status, None, now);
        Self {
            id: TaskId::new(),
            owner_id: owner,
            title: input.title,
            description: input.description,
            status: input.status,
            priority: input.priority,
            due_date: input.due_date,
            tags: input.tags,
            is_completed: completion.is_completed,
            completed_at: completion.completed_at,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merges the fields present in `patch` and refreshes derived fields.
    pub fn apply(&mut self, patch: TaskPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(status) = patch.status {
            self.set_status(status, now);
        }
        self.updated_at = now;
    }

    /// Sets the status and recomputes the completion fields.
    pub fn set_status(&mut self, status: TaskStatus, now: DateTime<Utc>) {
        let completion = derive_completion(status, self.completed_at, now);
        self.status = status;
        self.is_completed = completion.is_completed;
        self.completed_at = completion.completed_at;
    }

    /// Whether the completion fields agree with `status`.
    #[must_use]
    pub const fn completion_is_consistent(&self) -> bool {
        let completed = matches!(self.status, TaskStatus::Completed);
        completed == self.is_completed && completed == self.completed_at.is_some()
    }
}
