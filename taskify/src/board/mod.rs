//! Board reconciliation and state-transition engine.
//!
//! The view store is only ever written by the change feed; user intents go
//! through the mutation gateway to the backing store and come back as the
//! next snapshot. The resolver and projector are pure functions over task
//! statuses and views.

pub mod gateway;
pub mod projector;
pub mod resolver;
pub mod view;

pub use gateway::{Intent, MutationGateway, Outcome, StoreCommand};
pub use projector::{Columns, project};
pub use resolver::{can_drop, resolve};
pub use view::{Applied, BoardView, ViewError, ViewStore};

use taskify_model::{TaskId, ValidationError};

use crate::store::StoreError;

/// Errors surfaced to callers of board operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum BoardError {
    /// The input was rejected before any store command was issued.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The store has no task with this identifier.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The store could not carry out the command.
    #[error("store error: {0}")]
    Transport(StoreError),
}

impl From<StoreError> for BoardError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Transport(other),
        }
    }
}
