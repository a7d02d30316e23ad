//! Task store: the single source of truth for every task.
//!
//! Every read and write is scoped to an owner. A task that exists but belongs
//! to someone else is reported exactly like a task that does not exist, so
//! callers cannot probe for other users' ids.
//!
//! The store is in-memory behind a [`RwLock`]. When opened with a snapshot
//! path, every mutation rewrites the snapshot while the write lock is held;
//! if that write fails the in-memory change is rolled back and the caller
//! sees [`StoreError::Snapshot`].

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use taskdeck_proto::input::{NewTask, TaskPatch};
use taskdeck_proto::query::TaskQuery;
use taskdeck_proto::stats::TaskStats;
use taskdeck_proto::task::{Task, TaskId, UserId};
use tokio::sync::RwLock;

use crate::snapshot::{self, SnapshotError};

/// Errors returned by [`TaskStore`] operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No task with that id is owned by the caller.
    #[error("task not found")]
    NotFound,

    /// The change could not be made durable and was rolled back.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Owner-scoped task storage.
pub struct TaskStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
    snapshot_path: Option<PathBuf>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    /// Creates an empty, memory-only store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            snapshot_path: None,
        }
    }

    /// Opens a store backed by the snapshot at `path`, loading any tasks
    /// already saved there.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if an existing snapshot cannot be read.
    pub async fn open(path: PathBuf) -> Result<Self, SnapshotError> {
        let saved: Vec<Task> = snapshot::load(&path).await?.unwrap_or_default();
        tracing::info!(path = %path.display(), count = saved.len(), "loaded task snapshot");
        let tasks = saved
            .into_iter()
            .map(|task| (task.id.clone(), task))
            .collect();
        Ok(Self {
            tasks: RwLock::new(tasks),
            snapshot_path: Some(path),
        })
    }

    /// Creates a task owned by `owner` from validated input.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Snapshot`] if the new task could not be saved.
    pub async fn create(
        &self,
        owner: &UserId,
        input: NewTask,
        now: DateTime<Utc>,
    ) -> Result<Task, StoreError> {
        let task = Task::create(owner.clone(), input, now);
        let mut tasks = self.tasks.write().await;
        tasks.insert(task.id.clone(), task.clone());
        if let Err(e) = self.flush(&tasks).await {
            tasks.remove(&task.id);
            return Err(e.into());
        }
        drop(tasks);
        Ok(task)
    }

    /// Returns the owner's task with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the id is unknown or owned by
    /// someone else.
    pub async fn get(&self, owner: &UserId, id: &TaskId) -> Result<Task, StoreError> {
        let tasks = self.tasks.read().await;
        owned(&tasks, owner, id).cloned().ok_or(StoreError::NotFound)
    }

    /// Lists the owner's tasks, filtered and ordered by `query`.
    pub async fn list(&self, owner: &UserId, query: &TaskQuery) -> Vec<Task> {
        let mut list: Vec<Task> = {
            let tasks = self.tasks.read().await;
            tasks
                .values()
                .filter(|task| &task.owner_id == owner)
                .cloned()
                .collect()
        };
        query.apply(&mut list);
        list
    }

    /// Applies a validated patch to one of the owner's tasks.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the task is not the owner's, or
    /// [`StoreError::Snapshot`] if the change could not be saved.
    pub async fn update(
        &self,
        owner: &UserId,
        id: &TaskId,
        patch: TaskPatch,
        now: DateTime<Utc>,
    ) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        let Some(current) = owned(&tasks, owner, id) else {
            return Err(StoreError::NotFound);
        };
        let mut updated = current.clone();
        updated.apply(patch, now);

        let previous = tasks.insert(id.clone(), updated.clone());
        if let Err(e) = self.flush(&tasks).await {
            if let Some(previous) = previous {
                tasks.insert(id.clone(), previous);
            }
            return Err(e.into());
        }
        drop(tasks);
        Ok(updated)
    }

    /// Deletes one of the owner's tasks, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the task is not the owner's, or
    /// [`StoreError::Snapshot`] if the deletion could not be saved.
    pub async fn delete(&self, owner: &UserId, id: &TaskId) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        if owned(&tasks, owner, id).is_none() {
            return Err(StoreError::NotFound);
        }
        let Some(removed) = tasks.remove(id) else {
            return Err(StoreError::NotFound);
        };
        if let Err(e) = self.flush(&tasks).await {
            tasks.insert(id.clone(), removed);
            return Err(e.into());
        }
        drop(tasks);
        Ok(removed)
    }

    /// Aggregate counts over the owner's tasks.
    pub async fn stats(&self, owner: &UserId) -> TaskStats {
        let tasks = self.tasks.read().await;
        TaskStats::from_tasks(tasks.values().filter(|task| &task.owner_id == owner))
    }

    /// Total number of tasks across all owners.
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Whether the store holds no tasks at all.
    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Rewrites the snapshot, oldest task first.
    async fn flush(&self, tasks: &HashMap<TaskId, Task>) -> Result<(), SnapshotError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let mut ordered: Vec<&Task> = tasks.values().collect();
        ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        snapshot::save(path, &ordered).await
    }
}

fn owned<'a>(tasks: &'a HashMap<TaskId, Task>, owner: &UserId, id: &TaskId) -> Option<&'a Task> {
    tasks.get(id).filter(|task| &task.owner_id == owner)
}
