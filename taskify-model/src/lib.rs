//! Shared task entity model for `Taskify`.
//!
//! Everything here is plain data: identifiers, the status enumeration, title
//! validation, the drag payload, and the partial-update patch sent to the
//! backing store. No I/O and no async.

pub mod status;
pub mod task;

pub use status::{TaskAction, TaskStatus};
pub use task::{
    DragPayload, Task, TaskId, TaskPatch, ValidationError, is_valid_title, normalize_title,
};
