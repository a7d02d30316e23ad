//! Subscriber side of the change notification channel.
//!
//! Events only hint that something changed; they are never merged into a
//! [`crate::cache::TaskCache`]. A consumer that wants fresh data calls
//! `refresh` when one arrives.

use std::time::Duration;

use futures_util::StreamExt;
use taskdeck_proto::event::{self, TaskEvent};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use crate::client::ClientError;
use crate::config::ClientConfig;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// A live notification session for one user.
pub struct EventStream {
    ws: WsStream,
}

impl EventStream {
    /// Opens a notification session authenticated by `token`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] if the server rejects the token,
    /// [`ClientError::Url`] for an unusable server URL, or
    /// [`ClientError::Socket`] if the connection cannot be established
    /// within the configured connect timeout.
    pub async fn connect(config: &ClientConfig, token: &str) -> Result<Self, ClientError> {
        let url = websocket_url(&config.server_url, token)?;
        Self::connect_url(&url, config.connect_timeout).await
    }

    async fn connect_url(url: &Url, timeout: Duration) -> Result<Self, ClientError> {
        let (ws, _response) = tokio::time::timeout(timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| {
                tracing::warn!("notification connect timed out");
                ClientError::Socket("connect timed out".to_string())
            })?
            .map_err(|e| match e {
                tungstenite::Error::Http(response)
                    if response.status() == tungstenite::http::StatusCode::UNAUTHORIZED =>
                {
                    ClientError::Unauthorized
                }
                other => {
                    tracing::warn!(error = %other, "notification connect failed");
                    ClientError::Socket(other.to_string())
                }
            })?;
        tracing::info!("notification channel connected");
        Ok(Self { ws })
    }

    /// Waits for the next event.
    ///
    /// Returns `None` once the server closes the session. Frames that do not
    /// decode are logged and skipped.
    pub async fn next(&mut self) -> Option<Result<TaskEvent, ClientError>> {
        while let Some(frame) = self.ws.next().await {
            match frame {
                Ok(Message::Binary(data)) => match event::decode(&data) {
                    Ok(event) => {
                        tracing::debug!(event = event.name(), task_id = %event.task_id(), "task event received");
                        return Some(Ok(event));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping undecodable task event");
                    }
                },
                Ok(Message::Close(_)) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(ClientError::Socket(e.to_string()))),
            }
        }
        None
    }

    /// Closes the session.
    pub async fn close(mut self) {
        if let Err(e) = self.ws.close(None).await {
            tracing::debug!(error = %e, "notification close failed");
        }
    }
}

/// The `/api/ws` URL for `server_url`, with the token in the query string.
///
/// # Errors
///
/// Returns [`ClientError::Url`] if `server_url` is not a valid URL.
pub fn websocket_url(server_url: &str, token: &str) -> Result<Url, ClientError> {
    let mut base = Url::parse(server_url)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    let mut url = base.join("api/ws")?;
    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    url.set_scheme(scheme)
        .map_err(|()| ClientError::Socket(format!("cannot use {scheme} for {server_url}")))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}
