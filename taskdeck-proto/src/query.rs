//! Filtering and ordering of task lists.
//!
//! The server applies a [`TaskQuery`] to the owner's tasks for `GET /tasks`;
//! the client uses the same [`TaskFilter`] for local reads over its cache.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::input::{FieldError, ValidationError};
use crate::task::{Priority, Task, TaskStatus};

/// Field a task list is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    /// Creation time.
    #[default]
    CreatedAt,
    /// Deadline; tasks without one compare lowest.
    DueDate,
    /// Priority rank (`low < medium < high`).
    Priority,
    /// Title, by Unicode scalar order.
    Title,
}

impl SortField {
    const ALL: [Self; 4] = [Self::CreatedAt, Self::DueDate, Self::Priority, Self::Title];

    /// Query-string name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "createdAt",
            Self::DueDate => "dueDate",
            Self::Priority => "priority",
            Self::Title => "title",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == s)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Smallest first.
    Asc,
    /// Largest first.
    #[default]
    Desc,
}

impl SortOrder {
    /// Query-string name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Optional equality filters. An empty filter matches every task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskFilter {
    /// Keep only tasks with this status.
    pub status: Option<TaskStatus>,
    /// Keep only tasks with this priority.
    pub priority: Option<Priority>,
}

impl TaskFilter {
    /// Whether `task` passes the filter.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.status.is_none_or(|s| task.status == s)
            && self.priority.is_none_or(|p| task.priority == p)
    }
}

/// Filter plus ordering for a task list. Defaults to all tasks, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskQuery {
    /// Which tasks to keep.
    pub filter: TaskFilter,
    /// Sort key.
    pub sort: SortField,
    /// Sort direction.
    pub order: SortOrder,
}

impl TaskQuery {
    /// Compares two tasks under this query's ordering.
    ///
    /// Ties on the sort key fall back to creation time and then id, in the
    /// same direction, so the order is total.
    #[must_use]
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let primary = match self.sort {
            SortField::CreatedAt => Ordering::Equal,
            SortField::DueDate => a.due_date.cmp(&b.due_date),
            SortField::Priority => a.priority.cmp(&b.priority),
            SortField::Title => a.title.cmp(&b.title),
        };
        let ordering = primary
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id));
        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }

    /// Filters and sorts `tasks` in place.
    pub fn apply(&self, tasks: &mut Vec<Task>) {
        tasks.retain(|task| self.filter.matches(task));
        tasks.sort_by(|a, b| self.compare(a, b));
    }
}

/// Raw `GET /tasks` query-string parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Status filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Priority filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Sort field name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    /// `asc` or `desc`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
}

impl ListParams {
    /// Validates the parameters into a [`TaskQuery`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] naming every unrecognized parameter value.
    pub fn parse(&self) -> Result<TaskQuery, ValidationError> {
        let mut errors = Vec::new();
        let mut query = TaskQuery::default();

        if let Some(raw) = &self.status {
            match raw.parse() {
                Ok(status) => query.filter.status = Some(status),
                Err(_) => errors.push(FieldError::new("status", "Invalid status")),
            }
        }
        if let Some(raw) = &self.priority {
            match raw.parse() {
                Ok(priority) => query.filter.priority = Some(priority),
                Err(_) => errors.push(FieldError::new("priority", "Invalid priority")),
            }
        }
        if let Some(raw) = &self.sort {
            match SortField::parse(raw) {
                Some(sort) => query.sort = sort,
                None => errors.push(FieldError::new("sort", "Invalid sort field")),
            }
        }
        if let Some(raw) = &self.order {
            match SortOrder::parse(raw) {
                Some(order) => query.order = order,
                None => errors.push(FieldError::new("order", "Invalid sort order")),
            }
        }

        if errors.is_empty() {
            Ok(query)
        } else {
            Err(ValidationError { errors })
        }
    }
}

impl From<&TaskQuery> for ListParams {
    fn from(query: &TaskQuery) -> Self {
        Self {
            status: query.filter.status.map(|s| s.as_str().to_string()),
            priority: query.filter.priority.map(|p| p.as_str().to_string()),
            sort: Some(query.sort.as_str().to_string()),
            order: Some(query.order.as_str().to_string()),
        }
    }
}
