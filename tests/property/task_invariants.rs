//! Property-based tests for the task lifecycle.
//!
//! Uses proptest to verify:
//! 1. After any sequence of updates, `status == completed` iff
//!    `is_completed` iff `completed_at` is set.
//! 2. Updates that do not touch `status` never touch the completion fields.
//! 3. Title validation accepts exactly the trimmed lengths 1..=100.
//! 4. Arbitrary JSON bodies never panic the validators.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use serde_json::{Value, json};
use taskdeck_proto::input::{NewTask, TaskPatch};
use taskdeck_proto::task::{MAX_TITLE_LENGTH, Priority, Task, TaskStatus, UserId};

fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0)
        .single()
        .unwrap_or_default()
}

/// Strategy for generating arbitrary `TaskStatus` values.
fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Todo),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Completed),
    ]
}

/// Strategy for generating arbitrary `Priority` values.
fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::Low), Just(Priority::Medium), Just(Priority::High)]
}

/// Strategy for generating arbitrary partial updates.
fn arb_patch() -> impl Strategy<Value = TaskPatch> {
    (
        proptest::option::of("[a-z]{1,20}"),
        proptest::option::of(arb_status()),
        proptest::option::of(arb_priority()),
        proptest::option::of(proptest::collection::vec("[a-z]{1,8}", 0..4)),
    )
        .prop_map(|(title, status, priority, tags)| TaskPatch {
            title,
            status,
            priority,
            tags,
            ..TaskPatch::default()
        })
}

/// Strategy for arbitrary JSON values a client might send.
fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        ".{0,120}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            proptest::collection::hash_map(
                prop_oneof![
                    Just("title".to_string()),
                    Just("description".to_string()),
                    Just("status".to_string()),
                    Just("priority".to_string()),
                    Just("dueDate".to_string()),
                    Just("tags".to_string()),
                    "[a-z]{1,6}",
                ],
                inner,
                0..6
            )
            .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn completion_consistent_after_any_updates(
        initial in arb_status(),
        patches in proptest::collection::vec(arb_patch(), 0..16),
    ) {
        let mut task = Task::create(
            UserId::new(),
            NewTask { status: initial, ..NewTask::titled("Invariant") },
            epoch(),
        );
        prop_assert!(task.completion_is_consistent());

        for (step, patch) in patches.into_iter().enumerate() {
            let now = epoch() + Duration::seconds(i64::try_from(step).unwrap_or(0) + 1);
            task.apply(patch, now);
            prop_assert!(task.completion_is_consistent());
            if let Some(completed_at) = task.completed_at {
                prop_assert!(completed_at >= task.created_at);
            }
        }
    }

    #[test]
    fn updates_without_status_keep_completion(
        initial in arb_status(),
        patch in arb_patch(),
    ) {
        let mut task = Task::create(
            UserId::new(),
            NewTask { status: initial, ..NewTask::titled("Keep") },
            epoch(),
        );
        let before = (task.status, task.is_completed, task.completed_at);
        task.apply(TaskPatch { status: None, ..patch }, epoch() + Duration::hours(1));
        prop_assert_eq!((task.status, task.is_completed, task.completed_at), before);
    }

    #[test]
    fn title_accepted_iff_trimmed_length_in_range(title in "\\s{0,3}[^\\s]{0,110}\\s{0,3}") {
        let len = title.trim().chars().count();
        let result = NewTask::from_json(&json!({ "title": title }));
        prop_assert_eq!(result.is_ok(), (1..=MAX_TITLE_LENGTH).contains(&len));
    }

    #[test]
    fn validators_never_panic(body in arb_json()) {
        let _ = NewTask::from_json(&body);
        let _ = TaskPatch::from_json(&body);
        let _ = TaskPatch::status_from_json(&body);
    }
}
