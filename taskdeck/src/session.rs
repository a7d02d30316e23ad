//! Identity lifecycle: sign in, operate, sign out.
//!
//! A [`Session`] is either signed out or holds an identity: an authenticated
//! [`ApiClient`], the signed-in [`User`] and a [`TaskCache`] for them. The
//! cache is rebuilt whenever identity is gained and dropped whenever it is
//! lost, including when any request comes back `Unauthorized`.

use taskdeck_proto::account::{LoginRequest, RegisterRequest, User};
use taskdeck_proto::input::{NewTask, TaskPatch};
use taskdeck_proto::query::TaskQuery;
use taskdeck_proto::stats::TaskStats;
use taskdeck_proto::task::{Task, TaskId, TaskStatus};

use crate::cache::TaskCache;
use crate::client::{ApiClient, ClientError};
use crate::config::ClientConfig;

#[derive(Debug)]
struct Identity {
    client: ApiClient,
    user: User,
    cache: TaskCache,
}

/// One user's connection to the server.
#[derive(Debug)]
pub struct Session {
    anonymous: ApiClient,
    identity: Option<Identity>,
}

impl Session {
    /// A signed-out session for the configured server.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        Ok(Self {
            anonymous: ApiClient::new(config)?.without_token(),
            identity: None,
        })
    }

    /// Creates an account and signs in as it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if registration or the initial task load
    /// fails; the session is then signed out.
    pub async fn register(&mut self, request: &RegisterRequest) -> Result<User, ClientError> {
        self.identity = None;
        let auth = self.anonymous.register(request).await?;
        self.sign_in(auth.token, auth.user).await
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the credentials are rejected or the initial
    /// task load fails; the session is then signed out.
    pub async fn login(&mut self, request: &LoginRequest) -> Result<User, ClientError> {
        self.identity = None;
        let auth = self.anonymous.login(request).await?;
        self.sign_in(auth.token, auth.user).await
    }

    /// Signs in with a previously issued token.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] if the token is no longer valid.
    pub async fn resume(&mut self, token: &str) -> Result<User, ClientError> {
        self.identity = None;
        let client = self.anonymous.clone().with_token(token);
        let user = client.me().await?;
        self.sign_in(token.to_string(), user).await
    }

    /// Revokes the token (best effort) and forgets the identity.
    pub async fn logout(&mut self) {
        let Some(identity) = self.identity.take() else {
            return;
        };
        if let Err(e) = identity.client.logout().await {
            tracing::warn!(user_id = %identity.user.id, error = %e, "token revocation failed");
        }
        tracing::info!(user_id = %identity.user.id, "signed out");
    }

    /// The signed-in user.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.identity.as_ref().map(|identity| &identity.user)
    }

    /// The bearer token of the signed-in user.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.identity
            .as_ref()
            .and_then(|identity| identity.client.token())
    }

    /// Whether a user is signed in.
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }

    /// The signed-in user's task cache.
    #[must_use]
    pub fn cache(&self) -> Option<&TaskCache> {
        self.identity.as_ref().map(|identity| &identity.cache)
    }

    /// Reloads the cache from the server.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SignedOut`] without an identity, or the
    /// request's error.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        let identity = self.identity_mut()?;
        let result = identity.cache.refresh(&identity.client).await;
        self.observe(result)
    }

    /// Lists tasks with server-side filtering and ordering. The cache is
    /// not touched.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SignedOut`] without an identity, or the
    /// request's error.
    pub async fn list_tasks(&mut self, query: &TaskQuery) -> Result<Vec<Task>, ClientError> {
        let result = self.identity_mut()?.client.list_tasks(query).await;
        self.observe(result)
    }

    /// Fetches a task from the server.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SignedOut`] without an identity, or the
    /// request's error.
    pub async fn get_task(&mut self, id: &TaskId) -> Result<Task, ClientError> {
        let result = self.identity_mut()?.client.get_task(id).await;
        self.observe(result)
    }

    /// Server-computed counts.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SignedOut`] without an identity, or the
    /// request's error.
    pub async fn stats(&mut self) -> Result<TaskStats, ClientError> {
        let result = self.identity_mut()?.client.stats().await;
        self.observe(result)
    }

    /// Creates a task through the cache.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SignedOut`] without an identity, or the
    /// request's error.
    pub async fn create_task(&mut self, input: &NewTask) -> Result<Task, ClientError> {
        let identity = self.identity_mut()?;
        let result = identity.cache.create(&identity.client, input).await;
        self.observe(result)
    }

    /// Updates a task through the cache.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SignedOut`] without an identity, or the
    /// request's error.
    pub async fn update_task(&mut self, id: &TaskId, patch: &TaskPatch) -> Result<Task, ClientError> {
        let identity = self.identity_mut()?;
        let result = identity.cache.update(&identity.client, id, patch).await;
        self.observe(result)
    }

    /// Changes a task's status through the cache.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SignedOut`] without an identity, or the
    /// request's error.
    pub async fn set_status(&mut self, id: &TaskId, status: TaskStatus) -> Result<Task, ClientError> {
        let identity = self.identity_mut()?;
        let result = identity.cache.set_status(&identity.client, id, status).await;
        self.observe(result)
    }

    /// Deletes a task through the cache.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SignedOut`] without an identity, or the
    /// request's error.
    pub async fn delete_task(&mut self, id: &TaskId) -> Result<(), ClientError> {
        let identity = self.identity_mut()?;
        let result = identity.cache.delete(&identity.client, id).await;
        self.observe(result)
    }

    async fn sign_in(&mut self, token: String, user: User) -> Result<User, ClientError> {
        let client = self.anonymous.clone().with_token(token);
        let cache = TaskCache::load(&client, user.id.clone()).await?;
        tracing::info!(user_id = %user.id, tasks = cache.len(), "signed in");
        self.identity = Some(Identity {
            client,
            user: user.clone(),
            cache,
        });
        Ok(user)
    }

    fn identity_mut(&mut self) -> Result<&mut Identity, ClientError> {
        self.identity.as_mut().ok_or(ClientError::SignedOut)
    }

    fn observe<T>(&mut self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        if matches!(result, Err(ClientError::Unauthorized)) && self.identity.take().is_some() {
            tracing::info!("token rejected, signed out");
        }
        result
    }
}
