//! Pure drag-and-drop transition rules.
//!
//! Decides where a dragged task lands given its status and the column it was
//! dropped on. Tasks only move forward, `complete` is terminal, and a task
//! already in process snaps back to `inprocess` when dropped on `todo`.

use taskify_model::{DragPayload, TaskStatus};

/// Returns `true` if `payload` may be dropped on the `target` column.
///
/// Dropping a card onto its own column is rejected here, before
/// [`resolve`] is consulted.
#[must_use]
pub fn can_drop(payload: &DragPayload, target: TaskStatus) -> bool {
    payload.status != target
}

/// Maps a drag source status and drop target column to the new status.
///
/// Returns `None` when the drop must not issue any command.
#[must_use]
pub const fn resolve(source: TaskStatus, target: TaskStatus) -> Option<TaskStatus> {
    match (source, target) {
        (TaskStatus::Todo, TaskStatus::InProcess) => Some(TaskStatus::InProcess),
        (TaskStatus::Todo | TaskStatus::InProcess, TaskStatus::Complete) => {
            Some(TaskStatus::Complete)
        }
        // No regression past start: a task in process stays in process.
        (TaskStatus::InProcess, TaskStatus::Todo) => Some(TaskStatus::InProcess),
        (TaskStatus::Todo, TaskStatus::Todo)
        | (TaskStatus::InProcess, TaskStatus::InProcess)
        | (TaskStatus::Complete, _) => None,
    }
}
