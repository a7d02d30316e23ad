//! Client-side mirror of one user's tasks.
//!
//! The cache keeps tasks keyed by id in display order. It is only ever
//! updated from server responses: a mutation is sent first and the literal
//! returned task is merged on success. On failure the cache is left as it
//! was, except that an `Unauthorized` failure empties it since the identity
//! it belonged to is gone.

use chrono::{DateTime, FixedOffset, Utc};
use indexmap::IndexMap;
use taskdeck_proto::input::{NewTask, TaskPatch};
use taskdeck_proto::query::{TaskFilter, TaskQuery};
use taskdeck_proto::stats::TaskStats;
use taskdeck_proto::task::{Task, TaskId, TaskStatus, UserId};

use crate::client::{ApiClient, ClientError};
use crate::insights::{self, Insights};

/// In-memory, insertion-ordered mirror of the owner's tasks.
#[derive(Debug, Clone)]
pub struct TaskCache {
    owner: UserId,
    tasks: IndexMap<TaskId, Task>,
}

impl TaskCache {
    /// An empty cache for `owner`.
    #[must_use]
    pub fn new(owner: UserId) -> Self {
        Self {
            owner,
            tasks: IndexMap::new(),
        }
    }

    /// Builds a cache for `owner` from the server's default listing.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the listing fails.
    pub async fn load(client: &ApiClient, owner: UserId) -> Result<Self, ClientError> {
        let mut cache = Self::new(owner);
        cache.refresh(client).await?;
        Ok(cache)
    }

    /// Replaces the contents with a fresh default listing (newest first).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the listing fails; the cache is unchanged
    /// unless the failure was `Unauthorized`.
    pub async fn refresh(&mut self, client: &ApiClient) -> Result<(), ClientError> {
        let tasks = self.observe(client.list_tasks(&TaskQuery::default()).await)?;
        self.replace_all(tasks);
        tracing::debug!(owner_id = %self.owner, count = self.tasks.len(), "task cache refreshed");
        Ok(())
    }

    /// Replaces the contents wholesale, keeping the given order.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks
            .into_iter()
            .map(|task| (task.id.clone(), task))
            .collect();
    }

    /// Drops every task.
    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// Creates a task and places it first.
    ///
    /// # Errors
    ///
    /// Returns the server's [`ClientError`]; the cache is unchanged.
    pub async fn create(&mut self, client: &ApiClient, input: &NewTask) -> Result<Task, ClientError> {
        let task = self.observe(client.create_task(input).await)?;
        self.tasks.shift_insert(0, task.id.clone(), task.clone());
        Ok(task)
    }

    /// Updates a task and replaces it in place.
    ///
    /// # Errors
    ///
    /// Returns the server's [`ClientError`]; the cache is unchanged.
    pub async fn update(
        &mut self,
        client: &ApiClient,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> Result<Task, ClientError> {
        let task = self.observe(client.update_task(id, patch).await)?;
        self.merge(task.clone());
        Ok(task)
    }

    /// Changes a task's status and replaces it in place.
    ///
    /// # Errors
    ///
    /// Returns the server's [`ClientError`]; the cache is unchanged.
    pub async fn set_status(
        &mut self,
        client: &ApiClient,
        id: &TaskId,
        status: TaskStatus,
    ) -> Result<Task, ClientError> {
        let task = self.observe(client.set_status(id, status).await)?;
        self.merge(task.clone());
        Ok(task)
    }

    /// Deletes a task and removes it, preserving the order of the rest.
    ///
    /// # Errors
    ///
    /// Returns the server's [`ClientError`]; the cache is unchanged.
    pub async fn delete(&mut self, client: &ApiClient, id: &TaskId) -> Result<(), ClientError> {
        let deleted = self.observe(client.delete_task(id).await)?;
        self.tasks.shift_remove(&deleted);
        Ok(())
    }

    /// The owner this cache mirrors.
    #[must_use]
    pub const fn owner(&self) -> &UserId {
        &self.owner
    }

    /// A cached task.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Tasks in cache order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Number of cached tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Ids starting with `prefix`, in cache order.
    #[must_use]
    pub fn ids_with_prefix(&self, prefix: &str) -> Vec<&TaskId> {
        self.tasks
            .keys()
            .filter(|id| id.to_string().starts_with(prefix))
            .collect()
    }

    /// Tasks passing `filter`, in cache order.
    #[must_use]
    pub fn filter(&self, filter: &TaskFilter) -> Vec<&Task> {
        self.tasks().filter(|task| filter.matches(task)).collect()
    }

    /// Per-status and per-priority counts.
    #[must_use]
    pub fn counts(&self) -> TaskStats {
        TaskStats::from_tasks(self.tasks())
    }

    /// Incomplete tasks whose deadline is before `now`.
    #[must_use]
    pub fn overdue(&self, now: DateTime<Utc>) -> Vec<&Task> {
        self.tasks()
            .filter(|task| insights::is_overdue(task, now))
            .collect()
    }

    /// Tasks due on `now`'s calendar day in `offset`.
    #[must_use]
    pub fn due_today(&self, now: DateTime<Utc>, offset: FixedOffset) -> Vec<&Task> {
        self.tasks()
            .filter(|task| insights::is_due_today(task, now, offset))
            .collect()
    }

    /// Dashboard figures over the whole cache.
    #[must_use]
    pub fn insights(&self, now: DateTime<Utc>, offset: FixedOffset) -> Insights {
        Insights::from_tasks(self.tasks(), now, offset)
    }

    /// Replaces a task in place, or appends it if it was not cached.
    fn merge(&mut self, task: Task) {
        self.tasks.insert(task.id.clone(), task);
    }

    fn observe<T>(&mut self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        if matches!(result, Err(ClientError::Unauthorized)) {
            tracing::info!(owner_id = %self.owner, "session expired, clearing task cache");
            self.clear();
        }
        result
    }
}
