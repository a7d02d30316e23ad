//! Dashboard figures computed locally from cached tasks.
//!
//! Overdue compares full timestamps against `now`; due-today compares
//! calendar days in a caller-supplied offset. A task due at 09:00 today is
//! therefore both due today and, after 09:00, overdue.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use taskdeck_proto::stats::TaskStats;
use taskdeck_proto::task::{Task, TaskStatus};

/// Whether `task` is past its deadline and not completed.
#[must_use]
pub fn is_overdue(task: &Task, now: DateTime<Utc>) -> bool {
    task.status != TaskStatus::Completed && task.due_date.is_some_and(|due| due < now)
}

/// Whether `task` is due on the same calendar day as `now`, both viewed
/// in `offset`. Completion does not matter.
#[must_use]
pub fn is_due_today(task: &Task, now: DateTime<Utc>, offset: FixedOffset) -> bool {
    task.due_date.is_some_and(|due| {
        due.with_timezone(&offset).date_naive() == now.with_timezone(&offset).date_naive()
    })
}

/// `completed / total` as a whole percentage, rounded half up. Zero when
/// there are no tasks.
#[must_use]
pub fn completion_rate(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (completed.min(total) * 100 + total / 2) / total;
    u8::try_from(percent).unwrap_or(100)
}

/// Everything the dashboard shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    /// Per-status and per-priority counts.
    pub stats: TaskStats,
    /// Rounded percentage of completed tasks.
    pub completion_rate: u8,
    /// Incomplete tasks past their deadline.
    pub overdue: usize,
    /// Tasks due on today's calendar day.
    pub due_today: usize,
}

impl Insights {
    /// Computes the figures for `tasks` as of `now`.
    #[must_use]
    pub fn from_tasks<'a>(
        tasks: impl IntoIterator<Item = &'a Task>,
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Self {
        let tasks: Vec<&Task> = tasks.into_iter().collect();
        let stats = TaskStats::from_tasks(tasks.iter().copied());
        Self {
            completion_rate: completion_rate(stats.completed, stats.total),
            overdue: tasks.iter().filter(|t| is_overdue(t, now)).count(),
            due_today: tasks
                .iter()
                .filter(|t| is_due_today(t, now, offset))
                .count(),
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use taskdeck_proto::input::NewTask;
    use taskdeck_proto::task::{Priority, UserId};

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn task(status: TaskStatus, due: Option<&str>) -> Task {
        Task::create(
            UserId::new(),
            NewTask {
                status,
                due_date: due.map(at),
                ..NewTask::titled("t")
            },
            Utc.timestamp_opt(0, 0).single().unwrap(),
        )
    }

    #[test]
    fn overdue_needs_past_deadline_and_incomplete() {
        let now = at("2025-03-10T12:00:00Z");
        assert!(is_overdue(&task(TaskStatus::Todo, Some("2025-03-10T11:59:59Z")), now));
        assert!(!is_overdue(&task(TaskStatus::Todo, Some("2025-03-10T12:00:00Z")), now));
        assert!(!is_overdue(&task(TaskStatus::Completed, Some("2025-03-01T00:00:00Z")), now));
        assert!(!is_overdue(&task(TaskStatus::InProgress, None), now));
    }

    #[test]
    fn due_today_uses_calendar_day_in_offset() {
        let now = at("2025-03-10T23:30:00Z");
        let due = task(TaskStatus::Todo, Some("2025-03-11T01:00:00Z"));
        let utc = FixedOffset::east_opt(0).unwrap();
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert!(!is_due_today(&due, now, utc));
        assert!(is_due_today(&due, now, plus_two));
    }

    #[test]
    fn midnight_due_date_is_both_due_today_and_overdue() {
        let now = at("2025-03-10T15:00:00Z");
        let due = task(TaskStatus::Todo, Some("2025-03-10T00:00:00Z"));
        let utc = FixedOffset::east_opt(0).unwrap();
        assert!(is_due_today(&due, now, utc));
        assert!(is_overdue(&due, now));
    }

    #[test]
    fn completion_rate_rounds() {
        assert_eq!(completion_rate(0, 0), 0);
        assert_eq!(completion_rate(1, 3), 33);
        assert_eq!(completion_rate(2, 3), 67);
        assert_eq!(completion_rate(1, 8), 13);
        assert_eq!(completion_rate(4, 4), 100);
    }

    #[test]
    fn insights_aggregate() {
        let now = at("2025-03-10T12:00:00Z");
        let utc = FixedOffset::east_opt(0).unwrap();
        let mut high = task(TaskStatus::Todo, Some("2025-03-09T00:00:00Z"));
        high.priority = Priority::High;
        let tasks = [
            high,
            task(TaskStatus::Completed, Some("2025-03-10T18:00:00Z")),
            task(TaskStatus::InProgress, None),
        ];
        let insights = Insights::from_tasks(&tasks, now, utc);
        assert_eq!(insights.stats.total, 3);
        assert_eq!(insights.stats.completed, 1);
        assert_eq!(insights.stats.high_priority, 1);
        assert_eq!(insights.completion_rate, 33);
        assert_eq!(insights.overdue, 1);
        assert_eq!(insights.due_today, 1);
    }

    #[test]
    fn empty_insights_are_zero() {
        let insights = Insights::from_tasks(&[], Utc::now(), FixedOffset::east_opt(0).unwrap());
        assert_eq!(insights, Insights::default());
    }
}
