//! Change notification hub and the `/api/ws` subscription endpoint.
//!
//! Each WebSocket connection is a session of one owner. The hub keeps an
//! unbounded sender per session; publishing encodes the event once and
//! pushes it to every session of the owner without awaiting delivery. A
//! session whose channel has closed is pruned on the next publish.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::rejection::QueryRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use taskdeck_proto::event::{self, TaskEvent};
use taskdeck_proto::task::UserId;
use tokio::sync::{RwLock, mpsc};

use crate::auth::bearer_token;
use crate::error::ApiError;
use crate::server::AppState;

/// Identifies one connected session of an owner.
pub type SessionId = u64;

/// Registry of connected sessions, grouped by owner.
pub struct NotificationHub {
    sessions: RwLock<HashMap<UserId, HashMap<SessionId, mpsc::UnboundedSender<Message>>>>,
    next_session: AtomicU64,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationHub {
    /// Creates a hub with no sessions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_session: AtomicU64::new(1),
        }
    }

    /// Adds a session for `owner`, returning its id.
    pub async fn subscribe(
        &self,
        owner: &UserId,
        sender: mpsc::UnboundedSender<Message>,
    ) -> SessionId {
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        self.sessions
            .write()
            .await
            .entry(owner.clone())
            .or_default()
            .insert(id, sender);
        id
    }

    /// Removes a session. Unknown ids are ignored.
    pub async fn unsubscribe(&self, owner: &UserId, session: SessionId) {
        let mut sessions = self.sessions.write().await;
        if let Some(owned) = sessions.get_mut(owner) {
            owned.remove(&session);
            if owned.is_empty() {
                sessions.remove(owner);
            }
        }
    }

    /// Pushes `event` to every session of `owner`.
    ///
    /// Never fails: encoding or delivery problems are logged and the number
    /// of sessions that accepted the frame is returned.
    pub async fn publish(&self, owner: &UserId, event: &TaskEvent) -> usize {
        let bytes = match event::encode(event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(owner_id = %owner, error = %e, "failed to encode task event");
                return 0;
            }
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        {
            let sessions = self.sessions.read().await;
            let Some(owned) = sessions.get(owner) else {
                return 0;
            };
            for (id, sender) in owned {
                if sender.send(Message::Binary(bytes.clone().into())).is_ok() {
                    delivered += 1;
                } else {
                    dead.push(*id);
                }
            }
        }

        if !dead.is_empty() {
            tracing::debug!(owner_id = %owner, count = dead.len(), "pruning closed sessions");
            for id in dead {
                self.unsubscribe(owner, id).await;
            }
        }

        tracing::debug!(
            owner_id = %owner,
            event = event.name(),
            task_id = %event.task_id(),
            delivered,
            "task event published"
        );
        delivered
    }

    /// Number of live sessions for `owner`.
    pub async fn session_count(&self, owner: &UserId) -> usize {
        self.sessions.read().await.get(owner).map_or(0, HashMap::len)
    }

    /// Sends a close frame to every session.
    pub async fn close_all(&self) {
        let sessions = self.sessions.read().await;
        for sender in sessions.values().flat_map(HashMap::values) {
            let _ = sender.send(Message::Close(None));
        }
    }
}

/// Query string accepted by `/api/ws`.
#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    /// Bearer token, for clients that cannot set headers on the upgrade.
    pub token: Option<String>,
}

/// `GET /api/ws`: authenticates, then upgrades to a notification session.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<WsParams>, QueryRejection>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => return ApiError::from(rejection).into_response(),
    };
    let token = params
        .token
        .as_deref()
        .or_else(|| bearer_token(&headers));
    let owner = match token {
        Some(token) => state.accounts.resolve(token).await,
        None => None,
    };
    let Some(owner) = owner else {
        return ApiError::Unauthorized.into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(socket, state, owner))
}

/// Runs one notification session until either side closes it.
///
/// Incoming frames are read only to notice the close; the channel is
/// server-to-client.
pub async fn handle_socket(socket: WebSocket, state: Arc<AppState>, owner: UserId) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let session = state.hub.subscribe(&owner, tx).await;
    tracing::info!(owner_id = %owner, session, "notification session opened");

    let writer_owner = owner.clone();
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if ws_sender.send(msg).await.is_err() {
                tracing::debug!(owner_id = %writer_owner, "notification write failed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut read_task => write_task.abort(),
        _ = &mut write_task => read_task.abort(),
    }

    state.hub.unsubscribe(&owner, session).await;
    tracing::info!(owner_id = %owner, session, "notification session closed");
}
