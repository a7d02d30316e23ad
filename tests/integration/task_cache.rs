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

//! Integration tests for the client cache and session.
//!
//! These tests validate:
//! - Signing in loads the owner's tasks, newest first
//! - Mutations update the cache from server responses only
//! - Failed mutations leave the cache untouched
//! - An `Unauthorized` response signs the session out and drops the cache
//! - Resuming from a saved token restores the same view

use chrono::{Duration, FixedOffset, Utc};
use taskdeck::cache::TaskCache;
use taskdeck::client::{ApiClient, ClientError};
use taskdeck::config::ClientConfig;
use taskdeck::session::Session;
use taskdeck_proto::account::{LoginRequest, RegisterRequest};
use taskdeck_proto::input::{NewTask, TaskPatch};
use taskdeck_proto::query::TaskFilter;
use taskdeck_proto::task::{Priority, TaskId, TaskStatus};

async fn start_server() -> ClientConfig {
    let (addr, _handle) = taskdeck_server::server::start_server("127.0.0.1:0")
        .await
        .unwrap();
    ClientConfig::for_server(format!("http://{addr}"))
}

fn alice() -> RegisterRequest {
    RegisterRequest {
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        password: "Secret123".to_string(),
    }
}

fn cached_titles(session: &Session) -> Vec<String> {
    session
        .cache()
        .unwrap()
        .tasks()
        .map(|t| t.title.clone())
        .collect()
}

#[tokio::test]
async fn register_starts_with_empty_cache() {
    let config = start_server().await;
    let mut session = Session::new(&config).unwrap();

    let user = session.register(&alice()).await.unwrap();
    assert_eq!(user.email, "alice@example.com");
    assert!(session.is_signed_in());
    assert!(session.token().is_some());

    let cache = session.cache().unwrap();
    assert!(cache.is_empty());
    assert_eq!(cache.owner(), &user.id);
}

#[tokio::test]
async fn mutations_keep_cache_in_display_order() {
    let config = start_server().await;
    let mut session = Session::new(&config).unwrap();
    session.register(&alice()).await.unwrap();

    let first = session.create_task(&NewTask::titled("first")).await.unwrap();
    let second = session.create_task(&NewTask::titled("second")).await.unwrap();
    let third = session.create_task(&NewTask::titled("third")).await.unwrap();
    assert_eq!(cached_titles(&session), vec!["third", "second", "first"]);

    let patch = TaskPatch {
        title: Some("second (edited)".to_string()),
        ..TaskPatch::default()
    };
    session.update_task(&second.id, &patch).await.unwrap();
    assert_eq!(
        cached_titles(&session),
        vec!["third", "second (edited)", "first"]
    );

    let done = session
        .set_status(&first.id, TaskStatus::Completed)
        .await
        .unwrap();
    assert_eq!(session.cache().unwrap().get(&first.id), Some(&done));

    session.delete_task(&third.id).await.unwrap();
    assert_eq!(cached_titles(&session), vec!["second (edited)", "first"]);

    // A fresh listing agrees with the incrementally maintained cache.
    let before = cached_titles(&session);
    session.refresh().await.unwrap();
    assert_eq!(cached_titles(&session), before);
}

#[tokio::test]
async fn failed_mutations_leave_cache_untouched() {
    let config = start_server().await;
    let mut session = Session::new(&config).unwrap();
    session.register(&alice()).await.unwrap();
    let task = session.create_task(&NewTask::titled("keep")).await.unwrap();

    let empty_title = TaskPatch {
        title: Some(" ".to_string()),
        ..TaskPatch::default()
    };
    assert!(matches!(
        session.update_task(&task.id, &empty_title).await,
        Err(ClientError::Validation { .. })
    ));
    assert!(matches!(
        session.delete_task(&TaskId::new()).await,
        Err(ClientError::NotFound(_))
    ));

    assert!(session.is_signed_in());
    assert_eq!(session.cache().unwrap().get(&task.id), Some(&task));
    assert_eq!(session.cache().unwrap().len(), 1);
}

#[tokio::test]
async fn unauthorized_signs_out_and_clears_cache() {
    let config = start_server().await;
    let mut session = Session::new(&config).unwrap();
    session.register(&alice()).await.unwrap();
    session.create_task(&NewTask::titled("secret")).await.unwrap();

    // Revoke the token from elsewhere.
    let token = session.token().unwrap().to_string();
    ApiClient::new(&config)
        .unwrap()
        .with_token(token)
        .logout()
        .await
        .unwrap();

    let result = session.create_task(&NewTask::titled("after revoke")).await;
    assert!(matches!(result, Err(ClientError::Unauthorized)));
    assert!(!session.is_signed_in());
    assert!(session.cache().is_none());
    assert!(matches!(session.refresh().await, Err(ClientError::SignedOut)));
}

#[tokio::test]
async fn resume_and_login_see_the_same_tasks() {
    let config = start_server().await;
    let mut first = Session::new(&config).unwrap();
    first.register(&alice()).await.unwrap();
    first.create_task(&NewTask::titled("a")).await.unwrap();
    first.create_task(&NewTask::titled("b")).await.unwrap();
    let token = first.token().unwrap().to_string();

    let mut resumed = Session::new(&config).unwrap();
    resumed.resume(&token).await.unwrap();
    assert_eq!(cached_titles(&resumed), vec!["b", "a"]);

    let mut relogged = Session::new(&config).unwrap();
    relogged
        .login(&LoginRequest {
            email: "Alice@Example.com".to_string(),
            password: "Secret123".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(cached_titles(&relogged), vec!["b", "a"]);

    relogged.logout().await;
    assert!(!relogged.is_signed_in());
    // Other tokens for the same account stay valid.
    assert!(resumed.refresh().await.is_ok());
}

#[tokio::test]
async fn bad_resume_leaves_session_signed_out() {
    let config = start_server().await;
    let mut session = Session::new(&config).unwrap();
    assert!(matches!(
        session.resume("stale-token").await,
        Err(ClientError::Unauthorized)
    ));
    assert!(!session.is_signed_in());
}

#[tokio::test]
async fn local_reads_over_loaded_cache() {
    let config = start_server().await;
    let mut session = Session::new(&config).unwrap();
    let user = session.register(&alice()).await.unwrap();
    let now = Utc::now();

    session
        .create_task(&NewTask {
            priority: Priority::High,
            due_date: Some(now - Duration::hours(1)),
            ..NewTask::titled("late")
        })
        .await
        .unwrap();
    session
        .create_task(&NewTask {
            status: TaskStatus::Completed,
            due_date: Some(now - Duration::hours(1)),
            ..NewTask::titled("done")
        })
        .await
        .unwrap();
    session
        .create_task(&NewTask {
            due_date: Some(now + Duration::days(30)),
            ..NewTask::titled("later")
        })
        .await
        .unwrap();

    // Load a second, independent cache from the same account.
    let client = ApiClient::new(&config)
        .unwrap()
        .with_token(session.token().unwrap());
    let cache = TaskCache::load(&client, user.id.clone()).await.unwrap();
    assert_eq!(cache.len(), 3);

    let overdue: Vec<&str> = cache
        .overdue(now)
        .into_iter()
        .map(|t| t.title.as_str())
        .collect();
    assert_eq!(overdue, vec!["late"]);

    let high = cache.filter(&TaskFilter {
        status: None,
        priority: Some(Priority::High),
    });
    assert_eq!(high.len(), 1);

    let insights = cache.insights(now, FixedOffset::east_opt(0).unwrap());
    assert_eq!(insights.stats.total, 3);
    assert_eq!(insights.stats.completed, 1);
    assert_eq!(insights.completion_rate, 33);
    assert_eq!(insights.overdue, 1);
}
