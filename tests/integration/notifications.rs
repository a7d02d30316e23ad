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

//! Integration tests for the change notification channel.
//!
//! These tests validate:
//! - Every session of the owner receives created/updated/deleted events
//! - Other owners' sessions receive nothing
//! - A failed operation publishes nothing
//! - A bad token is refused before the upgrade
//! - A malformed query string is refused with a JSON error body
//! - Server-initiated close ends the stream

use std::sync::Arc;
use std::time::Duration;

use taskdeck::client::{ApiClient, ClientError};
use taskdeck::config::ClientConfig;
use taskdeck::events::EventStream;
use taskdeck_proto::account::RegisterRequest;
use taskdeck_proto::api::ErrorBody;
use taskdeck_proto::event::TaskEvent;
use taskdeck_proto::input::NewTask;
use taskdeck_proto::task::{TaskId, TaskStatus, UserId};
use taskdeck_server::server::{self, AppState, DEFAULT_MAX_BODY_SIZE};
use tokio_tungstenite::tungstenite;

struct Harness {
    state: Arc<AppState>,
    config: ClientConfig,
}

impl Harness {
    async fn start() -> Self {
        let state = Arc::new(AppState::new());
        let (addr, _handle) =
            server::start_server_with_state("127.0.0.1:0", Arc::clone(&state), DEFAULT_MAX_BODY_SIZE)
                .await
                .unwrap();
        Self {
            state,
            config: ClientConfig::for_server(format!("http://{addr}")),
        }
    }

    async fn user(&self, name: &str) -> (ApiClient, UserId) {
        let client = ApiClient::new(&self.config).unwrap();
        let auth = client
            .register(&RegisterRequest {
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                password: "Secret123".to_string(),
            })
            .await
            .unwrap();
        (client.with_token(auth.token), auth.user.id)
    }

    /// Connects and waits until the server has registered the session.
    async fn subscribe(&self, client: &ApiClient, owner: &UserId) -> EventStream {
        let before = self.state.hub.session_count(owner).await;
        let stream = EventStream::connect(&self.config, client.token().unwrap())
            .await
            .unwrap();
        for _ in 0..100 {
            if self.state.hub.session_count(owner).await > before {
                return stream;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("notification session was never registered");
    }
}

async fn next_event(stream: &mut EventStream) -> TaskEvent {
    tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("timed out waiting for event")
        .expect("stream ended")
        .unwrap()
}

async fn assert_quiet(stream: &mut EventStream) {
    let result = tokio::time::timeout(Duration::from_millis(200), stream.next()).await;
    assert!(result.is_err(), "unexpected event: {result:?}");
}

#[tokio::test]
async fn owner_sessions_receive_lifecycle_events() {
    let harness = Harness::start().await;
    let (alice, alice_id) = harness.user("Alice").await;
    let mut first = harness.subscribe(&alice, &alice_id).await;
    let mut second = harness.subscribe(&alice, &alice_id).await;

    let task = alice.create_task(&NewTask::titled("Watch me")).await.unwrap();
    for stream in [&mut first, &mut second] {
        let TaskEvent::TaskCreated { task: created } = next_event(stream).await else {
            panic!("expected task-created");
        };
        assert_eq!(created, task);
    }

    let done = alice.set_status(&task.id, TaskStatus::Completed).await.unwrap();
    let TaskEvent::TaskUpdated { task: updated } = next_event(&mut first).await else {
        panic!("expected task-updated");
    };
    assert_eq!(updated, done);

    alice.delete_task(&task.id).await.unwrap();
    let event = next_event(&mut first).await;
    assert_eq!(event, TaskEvent::TaskDeleted { task_id: task.id.clone() });
    assert_eq!(event.name(), "task-deleted");
}

#[tokio::test]
async fn other_owners_hear_nothing() {
    let harness = Harness::start().await;
    let (alice, _) = harness.user("Alice").await;
    let (bob, bob_id) = harness.user("Bob").await;
    let mut bob_stream = harness.subscribe(&bob, &bob_id).await;

    alice.create_task(&NewTask::titled("Alice only")).await.unwrap();
    assert_quiet(&mut bob_stream).await;
}

#[tokio::test]
async fn failed_operations_publish_nothing() {
    let harness = Harness::start().await;
    let (alice, alice_id) = harness.user("Alice").await;
    let mut stream = harness.subscribe(&alice, &alice_id).await;

    assert!(matches!(
        alice.delete_task(&TaskId::new()).await,
        Err(ClientError::NotFound(_))
    ));
    assert!(matches!(
        alice.create_task(&NewTask::titled("")).await,
        Err(ClientError::Validation { .. })
    ));
    assert_quiet(&mut stream).await;
}

#[tokio::test]
async fn bad_token_is_refused() {
    let harness = Harness::start().await;
    let result = EventStream::connect(&harness.config, "not-a-token").await;
    assert!(matches!(result, Err(ClientError::Unauthorized)));
}

#[tokio::test]
async fn malformed_query_is_refused_with_json() {
    let harness = Harness::start().await;
    let (alice, _) = harness.user("Alice").await;
    let token = alice.token().unwrap();
    let url = format!(
        "{}/api/ws?token={token}&token={token}",
        harness.config.server_url.replacen("http", "ws", 1)
    );

    let Err(tungstenite::Error::Http(response)) = tokio_tungstenite::connect_async(url).await
    else {
        panic!("expected the upgrade to be refused");
    };
    assert_eq!(response.status(), tungstenite::http::StatusCode::BAD_REQUEST);
    let body: ErrorBody = serde_json::from_slice(response.body().as_deref().unwrap()).unwrap();
    let errors = body.errors.unwrap();
    assert_eq!(errors[0].field, "query");
}

#[tokio::test]
async fn server_close_ends_stream() {
    let harness = Harness::start().await;
    let (alice, alice_id) = harness.user("Alice").await;
    let mut stream = harness.subscribe(&alice, &alice_id).await;

    harness.state.hub.close_all().await;
    let end = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("timed out waiting for close");
    assert!(end.is_none());
}
