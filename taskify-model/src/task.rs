//! Task entity, identifiers, and title validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::status::TaskStatus;

/// Errors raised when user input cannot become a valid task field.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The title is empty or whitespace only.
    #[error("task title cannot be empty")]
    EmptyTitle,
    /// The status name is not one of `todo`, `inprocess`, `complete`.
    #[error("unknown task status: {0}")]
    UnknownStatus(String),
}

/// Unique identifier for a task, assigned by the backing store.
///
/// Based on UUID v7 so identifiers sort roughly by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new time-ordered task identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `TaskId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returns `true` if `title` still has content after trimming.
#[must_use]
pub fn is_valid_title(title: &str) -> bool {
    !title.trim().is_empty()
}

/// Returns the trimmed title, or [`ValidationError::EmptyTitle`].
///
/// # Errors
///
/// Returns [`ValidationError::EmptyTitle`] if the title is empty or
/// whitespace only.
pub fn normalize_title(title: &str) -> Result<String, ValidationError> {
    if !is_valid_title(title) {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(title.trim().to_string())
}

/// A task as stored in the shared collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier.
    pub id: TaskId,
    /// Display title, never empty.
    pub title: String,
    /// Current column.
    pub status: TaskStatus,
    /// Store-assigned creation time in milliseconds since epoch.
    pub created_at: u64,
}

impl Task {
    /// Captures the drag payload for this task.
    #[must_use]
    pub fn drag_payload(&self) -> DragPayload {
        DragPayload {
            id: self.id,
            title: self.title.clone(),
            status: self.status,
        }
    }
}

/// What a drag gesture carries from its source card to the drop target.
///
/// Captured when the drag starts, so it reflects the task as it was known
/// locally at that moment and may be stale by the time it is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragPayload {
    /// Task being dragged.
    pub id: TaskId,
    /// Title at drag start.
    pub title: String,
    /// Status at drag start.
    pub status: TaskStatus,
}

/// Partial update for a single task.
///
/// Only the fields that are `Some` are written; everything else is left as
/// the store has it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    /// New title, already normalized.
    pub title: Option<String>,
    /// New status.
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    /// A patch that only changes the title.
    #[must_use]
    pub const fn title(title: String) -> Self {
        Self {
            title: Some(title),
            status: None,
        }
    }

    /// A patch that only changes the status.
    #[must_use]
    pub const fn status(status: TaskStatus) -> Self {
        Self {
            title: None,
            status: Some(status),
        }
    }

    /// Returns `true` if the patch writes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.status.is_none()
    }

    /// Applies the patch to `task` in place.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title.clone_from(title);
        }
        if let Some(status) = self.status {
            task.status = status;
        }
    }
}
