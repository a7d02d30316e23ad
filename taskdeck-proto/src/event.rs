//! Change notifications pushed to an owner's connected sessions.
//!
//! Events are postcard-encoded and sent as binary WebSocket frames. They are
//! hints only: delivery is best-effort and unordered across slow consumers,
//! so receivers should refetch rather than merge.

use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskId};

/// Error type for event encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A change to one of the owner's tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskEvent {
    /// A task was created.
    TaskCreated {
        /// The stored task.
        task: Task,
    },
    /// A task was updated (including status-only changes).
    TaskUpdated {
        /// The task after the update.
        task: Task,
    },
    /// A task was deleted.
    TaskDeleted {
        /// Id of the removed task.
        task_id: TaskId,
    },
}

impl TaskEvent {
    /// Event name, as logged and shown by `taskdeck watch`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TaskCreated { .. } => "task-created",
            Self::TaskUpdated { .. } => "task-updated",
            Self::TaskDeleted { .. } => "task-deleted",
        }
    }

    /// Id of the task the event is about.
    #[must_use]
    pub const fn task_id(&self) -> &TaskId {
        match self {
            Self::TaskCreated { task } | Self::TaskUpdated { task } => &task.id,
            Self::TaskDeleted { task_id } => task_id,
        }
    }
}

/// Encodes a [`TaskEvent`] into bytes using postcard.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the event cannot be serialized.
pub fn encode(event: &TaskEvent) -> Result<Vec<u8>, CodecError> {
    postcard::to_allocvec(event).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a [`TaskEvent`] from bytes using postcard.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the bytes are not a valid event.
pub fn decode(bytes: &[u8]) -> Result<TaskEvent, CodecError> {
    postcard::from_bytes(bytes).map_err(|e| CodecError::Serialization(e.to_string()))
}
