// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::doc_markdown,
    clippy::future_not_send,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Integration tests for the task API over real HTTP.
//!
//! Each test starts a server in-process on an ephemeral port and drives it
//! with [`ApiClient`]. These tests validate:
//! - The completion lifecycle of a task created, completed and reopened
//! - Per-owner scoping: foreign ids behave exactly like absent ones
//! - Validation failures have no side effects
//! - Filtering, ordering and stats
//! - Authentication of every task route

use chrono::{DateTime, Utc};
use taskdeck::client::{ApiClient, ClientError};
use taskdeck::config::ClientConfig;
use taskdeck_proto::account::{LoginRequest, RegisterRequest};
use taskdeck_proto::input::{NewTask, TaskPatch};
use taskdeck_proto::query::{SortField, SortOrder, TaskFilter, TaskQuery};
use taskdeck_proto::stats::TaskStats;
use taskdeck_proto::task::{Priority, TaskId, TaskStatus};

// =============================================================================
// Helpers
// =============================================================================

async fn start_server() -> String {
    let (addr, _handle) = taskdeck_server::server::start_server("127.0.0.1:0")
        .await
        .unwrap();
    format!("http://{addr}")
}

fn anonymous(url: &str) -> ApiClient {
    ApiClient::new(&ClientConfig::for_server(url)).unwrap()
}

async fn signed_in(url: &str, name: &str) -> ApiClient {
    let client = anonymous(url);
    let auth = client
        .register(&RegisterRequest {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            password: "Secret123".to_string(),
        })
        .await
        .unwrap();
    client.with_token(auth.token)
}

fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}

fn titles(tasks: &[taskdeck_proto::task::Task]) -> Vec<&str> {
    tasks.iter().map(|t| t.title.as_str()).collect()
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn write_spec_scenario() {
    let url = start_server().await;
    let alice = signed_in(&url, "Alice").await;

    let task = alice
        .create_task(&NewTask {
            priority: Priority::High,
            ..NewTask::titled("Write spec")
        })
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Todo);
    assert!(!task.is_completed);
    assert!(task.completed_at.is_none());

    let done = alice.set_status(&task.id, TaskStatus::Completed).await.unwrap();
    assert!(done.is_completed);
    assert!(done.completed_at.unwrap() >= done.created_at);

    let reopened = alice.set_status(&task.id, TaskStatus::Todo).await.unwrap();
    assert_eq!(reopened.status, TaskStatus::Todo);
    assert!(!reopened.is_completed);
    assert!(reopened.completed_at.is_none());
}

#[tokio::test]
async fn create_then_get_round_trips_fields() {
    let url = start_server().await;
    let alice = signed_in(&url, "Alice").await;

    let input = NewTask {
        description: "Quarterly".to_string(),
        status: TaskStatus::InProgress,
        priority: Priority::Low,
        due_date: Some(at("2025-04-15T00:00:00Z")),
        tags: vec!["money".to_string(), "gov".to_string()],
        ..NewTask::titled("File taxes")
    };
    let created = alice.create_task(&input).await.unwrap();
    let fetched = alice.get_task(&created.id).await.unwrap();

    assert_eq!(fetched, created);
    assert_eq!(fetched.title, "File taxes");
    assert_eq!(fetched.description, "Quarterly");
    assert_eq!(fetched.status, TaskStatus::InProgress);
    assert_eq!(fetched.priority, Priority::Low);
    assert_eq!(fetched.due_date, Some(at("2025-04-15T00:00:00Z")));
    assert_eq!(fetched.tags, vec!["money", "gov"]);
}

#[tokio::test]
async fn update_without_status_keeps_completion() {
    let url = start_server().await;
    let alice = signed_in(&url, "Alice").await;

    let task = alice
        .create_task(&NewTask {
            status: TaskStatus::Completed,
            ..NewTask::titled("Done already")
        })
        .await
        .unwrap();
    let completed_at = task.completed_at;
    assert!(completed_at.is_some());

    let patch = TaskPatch {
        title: Some("Renamed".to_string()),
        priority: Some(Priority::High),
        ..TaskPatch::default()
    };
    let updated = alice.update_task(&task.id, &patch).await.unwrap();
    assert_eq!(updated.title, "Renamed");
    assert_eq!(updated.status, TaskStatus::Completed);
    assert!(updated.is_completed);
    assert_eq!(updated.completed_at, completed_at);
}

#[tokio::test]
async fn update_can_clear_due_date() {
    let url = start_server().await;
    let alice = signed_in(&url, "Alice").await;

    let task = alice
        .create_task(&NewTask {
            due_date: Some(at("2025-05-01T00:00:00Z")),
            ..NewTask::titled("Book flights")
        })
        .await
        .unwrap();
    let patch = TaskPatch {
        due_date: Some(None),
        ..TaskPatch::default()
    };
    let updated = alice.update_task(&task.id, &patch).await.unwrap();
    assert!(updated.due_date.is_none());
}

#[tokio::test]
async fn delete_removes_task() {
    let url = start_server().await;
    let alice = signed_in(&url, "Alice").await;

    let task = alice.create_task(&NewTask::titled("Temp")).await.unwrap();
    let deleted = alice.delete_task(&task.id).await.unwrap();
    assert_eq!(deleted, task.id);
    assert!(matches!(
        alice.get_task(&task.id).await,
        Err(ClientError::NotFound(_))
    ));
    assert!(matches!(
        alice.delete_task(&task.id).await,
        Err(ClientError::NotFound(_))
    ));
}

// =============================================================================
// Scoping
// =============================================================================

#[tokio::test]
async fn foreign_task_is_indistinguishable_from_absent() {
    let url = start_server().await;
    let alice = signed_in(&url, "Alice").await;
    let bob = signed_in(&url, "Bob").await;

    let task = alice.create_task(&NewTask::titled("Private")).await.unwrap();
    let absent = TaskId::new();

    for id in [&task.id, &absent] {
        let ClientError::NotFound(message) = bob.get_task(id).await.unwrap_err() else {
            panic!("expected not found");
        };
        assert_eq!(message, "Task not found");

        let ClientError::NotFound(message) = bob
            .update_task(id, &TaskPatch::status(TaskStatus::Completed))
            .await
            .unwrap_err()
        else {
            panic!("expected not found");
        };
        assert_eq!(message, "Task not found");

        assert!(matches!(
            bob.delete_task(id).await,
            Err(ClientError::NotFound(_))
        ));
    }

    assert!(bob.list_tasks(&TaskQuery::default()).await.unwrap().is_empty());
    let still_there = alice.get_task(&task.id).await.unwrap();
    assert_eq!(still_there.status, TaskStatus::Todo);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn empty_title_rejected_without_side_effects() {
    let url = start_server().await;
    let alice = signed_in(&url, "Alice").await;
    alice.create_task(&NewTask::titled("Existing")).await.unwrap();

    let result = alice.create_task(&NewTask::titled("   ")).await;
    let Err(ClientError::Validation { errors, .. }) = result else {
        panic!("expected validation error");
    };
    assert!(errors.iter().any(|e| e.field == "title"));

    let tasks = alice.list_tasks(&TaskQuery::default()).await.unwrap();
    assert_eq!(titles(&tasks), vec!["Existing"]);
}

#[tokio::test]
async fn blank_title_update_rejected_without_side_effects() {
    let url = start_server().await;
    let alice = signed_in(&url, "Alice").await;
    let task = alice.create_task(&NewTask::titled("Keep me")).await.unwrap();

    let patch = TaskPatch {
        title: Some("  ".to_string()),
        status: Some(TaskStatus::Completed),
        priority: Some(Priority::High),
        ..TaskPatch::default()
    };
    let Err(ClientError::Validation { errors, .. }) = alice.update_task(&task.id, &patch).await
    else {
        panic!("expected validation error");
    };
    assert!(errors.iter().any(|e| e.field == "title"));

    let unchanged = alice.get_task(&task.id).await.unwrap();
    assert_eq!(unchanged, task);
    assert_eq!(unchanged.status, TaskStatus::Todo);
    assert!(unchanged.completed_at.is_none());
}

#[tokio::test]
async fn email_reuse_and_bad_login_rejected() {
    let url = start_server().await;
    let _alice = signed_in(&url, "Alice").await;
    let client = anonymous(&url);

    let duplicate = client
        .register(&RegisterRequest {
            name: "Other".to_string(),
            email: "ALICE@example.com".to_string(),
            password: "Secret123".to_string(),
        })
        .await;
    let Err(ClientError::Validation { message, .. }) = duplicate else {
        panic!("expected validation error");
    };
    assert_eq!(message, "User already exists");

    let wrong = client
        .login(&LoginRequest {
            email: "alice@example.com".to_string(),
            password: "Wrong1234".to_string(),
        })
        .await;
    let Err(ClientError::Validation { message, .. }) = wrong else {
        panic!("expected validation error");
    };
    assert_eq!(message, "Invalid credentials");

    let ok = client
        .login(&LoginRequest {
            email: "alice@example.com".to_string(),
            password: "Secret123".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(ok.user.name, "Alice");
}

// =============================================================================
// Listing and stats
// =============================================================================

#[tokio::test]
async fn status_filter_and_default_order() {
    let url = start_server().await;
    let alice = signed_in(&url, "Alice").await;

    for (title, status) in [
        ("one", TaskStatus::Completed),
        ("two", TaskStatus::Todo),
        ("three", TaskStatus::Completed),
        ("four", TaskStatus::InProgress),
    ] {
        alice
            .create_task(&NewTask {
                status,
                ..NewTask::titled(title)
            })
            .await
            .unwrap();
    }

    let all = alice.list_tasks(&TaskQuery::default()).await.unwrap();
    assert_eq!(titles(&all), vec!["four", "three", "two", "one"]);

    let completed = alice
        .list_tasks(&TaskQuery {
            filter: TaskFilter {
                status: Some(TaskStatus::Completed),
                priority: None,
            },
            ..TaskQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(titles(&completed), vec!["three", "one"]);

    let ascending = alice
        .list_tasks(&TaskQuery {
            filter: TaskFilter {
                status: Some(TaskStatus::Completed),
                priority: None,
            },
            order: SortOrder::Asc,
            ..TaskQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(titles(&ascending), vec!["one", "three"]);
}

#[tokio::test]
async fn due_date_sort_puts_undated_first_ascending() {
    let url = start_server().await;
    let alice = signed_in(&url, "Alice").await;

    for (title, due) in [
        ("late", Some("2025-06-01T00:00:00Z")),
        ("none", None),
        ("early", Some("2025-02-01T00:00:00Z")),
    ] {
        alice
            .create_task(&NewTask {
                due_date: due.map(at),
                ..NewTask::titled(title)
            })
            .await
            .unwrap();
    }

    let query = TaskQuery {
        sort: SortField::DueDate,
        order: SortOrder::Asc,
        ..TaskQuery::default()
    };
    let tasks = alice.list_tasks(&query).await.unwrap();
    assert_eq!(titles(&tasks), vec!["none", "early", "late"]);
}

#[tokio::test]
async fn stats_count_only_own_tasks() {
    let url = start_server().await;
    let alice = signed_in(&url, "Alice").await;
    let bob = signed_in(&url, "Bob").await;

    assert_eq!(alice.stats().await.unwrap(), TaskStats::default());

    alice
        .create_task(&NewTask {
            priority: Priority::High,
            status: TaskStatus::Completed,
            ..NewTask::titled("a")
        })
        .await
        .unwrap();
    alice.create_task(&NewTask::titled("b")).await.unwrap();
    bob.create_task(&NewTask::titled("c")).await.unwrap();

    let stats = alice.stats().await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.todo, 1);
    assert_eq!(stats.in_progress, 0);
    assert_eq!(stats.high_priority, 1);
    assert_eq!(stats.medium_priority, 1);
    assert_eq!(stats.low_priority, 0);
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn task_routes_require_a_token() {
    let url = start_server().await;
    let client = anonymous(&url);

    assert!(matches!(
        client.list_tasks(&TaskQuery::default()).await,
        Err(ClientError::Unauthorized)
    ));
    assert!(matches!(
        client.create_task(&NewTask::titled("")).await,
        Err(ClientError::Unauthorized)
    ));
    assert!(matches!(client.stats().await, Err(ClientError::Unauthorized)));

    let forged = client.with_token("not-a-real-token");
    assert!(matches!(forged.me().await, Err(ClientError::Unauthorized)));
}

#[tokio::test]
async fn logout_revokes_token() {
    let url = start_server().await;
    let alice = signed_in(&url, "Alice").await;

    assert_eq!(alice.me().await.unwrap().name, "Alice");
    assert_eq!(alice.health().await.unwrap().status, "ok");
    alice.logout().await.unwrap();
    assert!(matches!(
        alice.list_tasks(&TaskQuery::default()).await,
        Err(ClientError::Unauthorized)
    ));
}
