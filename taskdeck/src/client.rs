//! HTTP client for the Taskdeck REST API.
//!
//! An [`ApiClient`] is an explicit value holding the base URL and, once
//! signed in, the bearer token. There is no shared request state: two
//! clients built from the same config with different tokens act as two
//! independent users.

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use taskdeck_proto::account::{AuthResponse, LoginRequest, RegisterRequest, User, UserEnvelope};
use taskdeck_proto::api::{
    DeletedEnvelope, ErrorBody, Health, StatsEnvelope, StatusChange, TaskEnvelope, TaskList,
};
use taskdeck_proto::input::{FieldError, NewTask, TaskPatch, ValidationError};
use taskdeck_proto::query::{ListParams, TaskQuery};
use taskdeck_proto::stats::TaskStats;
use taskdeck_proto::task::{Task, TaskId, TaskStatus};
use url::Url;

use crate::config::ClientConfig;

/// Errors returned by client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server (or local pre-validation) rejected the input.
    #[error("{message}")]
    Validation {
        /// Summary message.
        message: String,
        /// Per-field problems.
        errors: Vec<FieldError>,
    },

    /// The task does not exist or is not ours.
    #[error("{0}")]
    NotFound(String),

    /// The token is missing, expired, or revoked.
    #[error("not signed in or session expired")]
    Unauthorized,

    /// A 5xx response. Worth retrying later.
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message from the response body.
        message: String,
    },

    /// Any other non-success response.
    #[error("unexpected response ({status}): {message}")]
    Unexpected {
        /// HTTP status code.
        status: u16,
        /// Message from the response body.
        message: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured server URL is not usable.
    #[error("invalid server URL: {0}")]
    Url(#[from] url::ParseError),

    /// The operation needs a signed-in session.
    #[error("not signed in")]
    SignedOut,

    /// The notification socket failed.
    #[error("notification channel error: {0}")]
    Socket(String),
}

impl ClientError {
    /// Whether the same request might succeed if repeated later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Server { .. } | Self::Socket(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

impl From<ValidationError> for ClientError {
    fn from(error: ValidationError) -> Self {
        Self::Validation {
            message: error.to_string(),
            errors: error.errors,
        }
    }
}

/// A client bound to one server and, optionally, one user's token.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Creates an unauthenticated client for the configured server.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Url`] for an unparsable server URL, or
    /// [`ClientError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut base = Url::parse(&config.server_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self {
            http,
            base,
            token: config.token.clone(),
        })
    }

    /// The same client, authenticating as `token`.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// The same client with no credential.
    #[must_use]
    pub fn without_token(mut self) -> Self {
        self.token = None;
        self
    }

    /// The bearer token, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Base URL every request path is resolved against (always ends in `/`).
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    /// `GET /health`
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the server is unreachable or unhealthy.
    pub async fn health(&self) -> Result<Health, ClientError> {
        self.send(self.request(Method::GET, "health")?).await
    }

    /// Creates an account.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for rejected fields or an email
    /// already in use.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        let builder = self.request(Method::POST, "api/auth/register")?.json(request);
        self.send(builder).await
    }

    /// Signs in.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for wrong credentials.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ClientError> {
        let builder = self.request(Method::POST, "api/auth/login")?.json(request);
        self.send(builder).await
    }

    /// The account the token belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] for a missing or stale token.
    pub async fn me(&self) -> Result<User, ClientError> {
        let envelope: UserEnvelope = self.send(self.request(Method::GET, "api/auth/me")?).await?;
        Ok(envelope.user)
    }

    /// Revokes the token on the server.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] if the token was already invalid.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let _: Value = self
            .send(self.request(Method::POST, "api/auth/logout")?)
            .await?;
        Ok(())
    }

    /// Lists tasks, filtered and sorted by the server.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on any failed request.
    pub async fn list_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>, ClientError> {
        let builder = self
            .request(Method::GET, "api/tasks")?
            .query(&ListParams::from(query));
        let list: TaskList = self.send(builder).await?;
        Ok(list.tasks)
    }

    /// Fetches one task.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] if the task is absent or not ours.
    pub async fn get_task(&self, id: &TaskId) -> Result<Task, ClientError> {
        let envelope: TaskEnvelope = self
            .send(self.request(Method::GET, &format!("api/tasks/{id}"))?)
            .await?;
        Ok(envelope.task)
    }

    /// Creates a task.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] if the server rejects the input.
    pub async fn create_task(&self, input: &NewTask) -> Result<Task, ClientError> {
        let builder = self.request(Method::POST, "api/tasks")?.json(input);
        let envelope: TaskEnvelope = self.send(builder).await?;
        Ok(envelope.task)
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] or [`ClientError::Validation`].
    pub async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, ClientError> {
        let builder = self
            .request(Method::PUT, &format!("api/tasks/{id}"))?
            .json(patch);
        let envelope: TaskEnvelope = self.send(builder).await?;
        Ok(envelope.task)
    }

    /// Changes only the status.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] if the task is absent or not ours.
    pub async fn set_status(&self, id: &TaskId, status: TaskStatus) -> Result<Task, ClientError> {
        let builder = self
            .request(Method::PATCH, &format!("api/tasks/{id}/status"))?
            .json(&StatusChange { status });
        let envelope: TaskEnvelope = self.send(builder).await?;
        Ok(envelope.task)
    }

    /// Deletes a task, returning the id the server confirmed.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] if the task is absent or not ours.
    pub async fn delete_task(&self, id: &TaskId) -> Result<TaskId, ClientError> {
        let envelope: DeletedEnvelope = self
            .send(self.request(Method::DELETE, &format!("api/tasks/{id}"))?)
            .await?;
        Ok(envelope.task_id)
    }

    /// Aggregate counts computed by the server.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on any failed request.
    pub async fn stats(&self) -> Result<TaskStats, ClientError> {
        let envelope: StatsEnvelope = self
            .send(self.request(Method::GET, "api/tasks/stats")?)
            .await?;
        Ok(envelope.stats)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let url = self.base.join(path)?;
        let builder = self.http.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        Err(error_from_response(status, response).await)
    }
}

async fn error_from_response(status: StatusCode, response: Response) -> ClientError {
    let body: Option<ErrorBody> = response.json().await.ok();
    let message = body
        .as_ref()
        .map_or_else(|| status.to_string(), |b| b.message.clone());
    tracing::debug!(status = status.as_u16(), message = %message, "request rejected");

    match status {
        StatusCode::BAD_REQUEST => ClientError::Validation {
            message,
            errors: body.and_then(|b| b.errors).unwrap_or_default(),
        },
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        s if s.is_server_error() => ClientError::Server {
            status: s.as_u16(),
            message,
        },
        s => ClientError::Unexpected {
            status: s.as_u16(),
            message,
        },
    }
}
