//! Mutation gateway: turns user intents into backing-store commands.
//!
//! The gateway validates an [`Intent`], decides whether it needs a store
//! command at all, and issues at most one command per intent. It reads the
//! local view (to skip redundant renames) but never writes it; the effect of
//! a command becomes visible only when the feed delivers the next snapshot.
//! Failures are returned to the caller and never retried.

use std::sync::Arc;

use taskify_model::{TaskId, TaskPatch, TaskStatus, normalize_title};

use super::BoardError;
use super::view::ViewStore;
use crate::store::{BackingStore, NewTask};

/// A user's request to change the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Create a task in `todo`.
    Create {
        /// Raw title as typed.
        title: String,
    },
    /// Change a task's title.
    Rename {
        /// Task to rename.
        id: TaskId,
        /// Raw title as typed.
        title: String,
    },
    /// Change a task's status.
    Move {
        /// Task to move.
        id: TaskId,
        /// Destination status.
        status: TaskStatus,
    },
    /// Remove a task.
    Delete {
        /// Task to delete.
        id: TaskId,
    },
}

/// The single backing-store call an intent resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCommand {
    /// Insert a new task.
    Insert(NewTask),
    /// Partial update of one task.
    UpdateFields {
        /// Task to update.
        id: TaskId,
        /// Fields to write.
        patch: TaskPatch,
    },
    /// Delete one task.
    Delete {
        /// Task to delete.
        id: TaskId,
    },
}

/// What happened to an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The store created a task with this identifier.
    Created(TaskId),
    /// The store applied an update to this task.
    Updated(TaskId),
    /// The store deleted this task.
    Deleted(TaskId),
    /// Nothing needed to change; no command was issued.
    Unchanged,
    /// The command was handed to a background task. Its effect arrives with
    /// a later snapshot; a failure is reported on the error channel.
    Pending,
}

/// Validates intents and issues the corresponding store commands.
pub struct MutationGateway<S> {
    store: Arc<S>,
    view: Arc<ViewStore>,
}

impl<S> Clone for MutationGateway<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            view: Arc::clone(&self.view),
        }
    }
}

impl<S: BackingStore> MutationGateway<S> {
    /// Creates a gateway writing to `store` and reading titles from `view`.
    #[must_use]
    pub const fn new(store: Arc<S>, view: Arc<ViewStore>) -> Self {
        Self { store, view }
    }

    /// Validates `intent` and builds its store command.
    ///
    /// Returns `Ok(None)` when the intent is a no-op (renaming a task to the
    /// title it already has).
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Validation`] for an empty or whitespace-only
    /// title.
    pub fn prepare(&self, intent: Intent) -> Result<Option<StoreCommand>, BoardError> {
        match intent {
            Intent::Create { title } => {
                let title = normalize_title(&title).inspect_err(|e| {
                    tracing::debug!(error = %e, "create rejected");
                })?;
                Ok(Some(StoreCommand::Insert(NewTask {
                    title,
                    status: TaskStatus::Todo,
                })))
            }
            Intent::Rename { id, title } => {
                let title = normalize_title(&title).inspect_err(|e| {
                    tracing::debug!(task_id = %id, error = %e, "rename rejected");
                })?;
                let view = self.view.get();
                if view.get(id).is_some_and(|task| task.title == title) {
                    tracing::debug!(task_id = %id, "rename skipped, title unchanged");
                    return Ok(None);
                }
                Ok(Some(StoreCommand::UpdateFields {
                    id,
                    patch: TaskPatch::title(title),
                }))
            }
            Intent::Move { id, status } => Ok(Some(StoreCommand::UpdateFields {
                id,
                patch: TaskPatch::status(status),
            })),
            Intent::Delete { id } => Ok(Some(StoreCommand::Delete { id })),
        }
    }

    /// Issues `command` to the backing store.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NotFound`] if the store has no such task, or
    /// [`BoardError::Transport`] for any other store failure.
    pub async fn execute(&self, command: StoreCommand) -> Result<Outcome, BoardError> {
        let result = match command {
            StoreCommand::Insert(task) => {
                tracing::info!(title = %task.title, "creating task");
                self.store.insert(task).await.map(Outcome::Created)
            }
            StoreCommand::UpdateFields { id, patch } => {
                tracing::info!(
                    task_id = %id,
                    title = ?patch.title,
                    status = ?patch.status,
                    "updating task"
                );
                self.store
                    .update_fields(id, patch)
                    .await
                    .map(|()| Outcome::Updated(id))
            }
            StoreCommand::Delete { id } => {
                tracing::info!(task_id = %id, "deleting task");
                self.store.delete(id).await.map(|()| Outcome::Deleted(id))
            }
        };

        result.map_err(|err| {
            let err = BoardError::from(err);
            match &err {
                BoardError::NotFound(id) => {
                    tracing::warn!(task_id = %id, "store reports task not found");
                }
                other => tracing::error!(error = %other, "store command failed"),
            }
            err
        })
    }

    /// Validates and carries out one intent.
    ///
    /// # Errors
    ///
    /// See [`prepare`](Self::prepare) and [`execute`](Self::execute).
    pub async fn handle(&self, intent: Intent) -> Result<Outcome, BoardError> {
        match self.prepare(intent)? {
            Some(command) => self.execute(command).await,
            None => Ok(Outcome::Unchanged),
        }
    }

    /// Creates a task in `todo` with the trimmed `title`.
    ///
    /// # Errors
    ///
    /// See [`handle`](Self::handle).
    pub async fn create(&self, title: &str) -> Result<Outcome, BoardError> {
        self.handle(Intent::Create {
            title: title.to_string(),
        })
        .await
    }

    /// Renames a task, skipping the write if the title would not change.
    ///
    /// # Errors
    ///
    /// See [`handle`](Self::handle).
    pub async fn rename(&self, id: TaskId, title: &str) -> Result<Outcome, BoardError> {
        self.handle(Intent::Rename {
            id,
            title: title.to_string(),
        })
        .await
    }

    /// Moves a task to `status`. Transition rules are the caller's concern.
    ///
    /// # Errors
    ///
    /// See [`handle`](Self::handle).
    pub async fn move_task(&self, id: TaskId, status: TaskStatus) -> Result<Outcome, BoardError> {
        self.handle(Intent::Move { id, status }).await
    }

    /// Deletes a task.
    ///
    /// # Errors
    ///
    /// See [`handle`](Self::handle).
    pub async fn delete(&self, id: TaskId) -> Result<Outcome, BoardError> {
        self.handle(Intent::Delete { id }).await
    }
}
