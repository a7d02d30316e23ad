//! Shared state, routing, and server startup.

use std::sync::Arc;

use axum::{Json, Router};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post};
use taskdeck_proto::api::Health;
use tower_http::trace::TraceLayer;

use crate::accounts::AccountRegistry;
use crate::config::ServerConfig;
use crate::notify::NotificationHub;
use crate::snapshot::SnapshotError;
use crate::store::TaskStore;
use crate::{api, auth, notify};

/// Default maximum accepted request body size in bytes (64 KB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024;

/// State shared by every handler.
pub struct AppState {
    /// Task documents.
    pub store: TaskStore,
    /// Accounts and live tokens.
    pub accounts: AccountRegistry,
    /// Connected notification sessions.
    pub hub: NotificationHub,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Memory-only state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: TaskStore::new(),
            accounts: AccountRegistry::new(),
            hub: NotificationHub::new(),
        }
    }

    /// State for a resolved configuration: snapshot-backed when a data
    /// directory is configured, memory-only otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if an existing snapshot cannot be loaded.
    pub async fn from_config(config: &ServerConfig) -> Result<Self, SnapshotError> {
        let Some(dir) = &config.data_dir else {
            return Ok(Self::new());
        };
        Ok(Self {
            store: TaskStore::open(dir.join("tasks.json")).await?,
            accounts: AccountRegistry::open(dir.join("accounts.json")).await?,
            hub: NotificationHub::new(),
        })
    }
}

/// Builds the application router.
pub fn router(state: Arc<AppState>, max_body_size: usize) -> Router {
    let routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .route("/tasks", get(api::list_tasks).post(api::create_task))
        .route("/tasks/stats", get(api::task_stats))
        .route(
            "/tasks/{id}",
            get(api::get_task)
                .put(api::update_task)
                .delete(api::delete_task),
        )
        .route("/tasks/{id}/status", patch(api::update_status))
        .route("/ws", get(notify::ws_handler));

    Router::new()
        .route("/health", get(health))
        .nest("/api", routes)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
    })
}

/// Starts the server on the given address with fresh in-memory state and
/// returns the bound address and a join handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(AppState::new()), DEFAULT_MAX_BODY_SIZE).await
}

/// Starts the server with a pre-built [`AppState`].
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<AppState>,
    max_body_size: usize,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(state, max_body_size);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "taskdeck server error");
        }
    });

    Ok((bound_addr, handle))
}
