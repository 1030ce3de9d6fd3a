//! Backing store port for `Taskify`.
//!
//! Defines the [`BackingStore`] trait the engine talks to. The store owns all
//! durable state: it assigns identifiers and creation times, applies partial
//! updates, and pushes complete collection snapshots to subscribers.
//! Concrete implementations include:
//! - [`memory::InMemoryBackingStore`]: in-process store shared by clients in
//!   the same process (tests, CLI)

pub mod memory;

use std::future::Future;

use tokio::sync::mpsc;

use taskify_model::{Task, TaskId, TaskPatch, TaskStatus};

/// A complete, ordered listing of the collection (newest first).
pub type Snapshot = Vec<Task>;

/// Errors reported by the backing store.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// The task does not exist (any more).
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The store could not be reached or refused the command.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store has shut down.
    #[error("store closed")]
    Closed,
}

/// Fields supplied by the client when creating a task.
///
/// The identifier and creation time are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Normalized title.
    pub title: String,
    /// Initial status.
    pub status: TaskStatus,
}

/// Async contract for the shared task collection.
///
/// # Invariant
///
/// Snapshots delivered through a [`Subscription`] are complete (not diffs)
/// and arrive in the order the store produced them.
pub trait BackingStore: Send + Sync {
    /// Subscribe to the collection ordered by creation time, newest first.
    ///
    /// The first snapshot describes the collection at subscription time;
    /// every later change produces another one.
    fn subscribe(&self) -> impl Future<Output = Result<Subscription, StoreError>> + Send;

    /// Insert a new task, returning its store-assigned identifier.
    fn insert(&self, task: NewTask) -> impl Future<Output = Result<TaskId, StoreError>> + Send;

    /// Write only the fields present in `patch`.
    ///
    /// Fails with [`StoreError::NotFound`] if the task does not exist.
    fn update_fields(
        &self,
        id: TaskId,
        patch: TaskPatch,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete a task.
    ///
    /// Fails with [`StoreError::NotFound`] if the task does not exist.
    fn delete(&self, id: TaskId) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Callback run once when a subscription is released.
type ReleaseHook = Box<dyn FnOnce() + Send>;

/// Live query handle returned by [`BackingStore::subscribe`].
///
/// Releasing is idempotent: the release hook runs exactly once, whether via
/// [`unsubscribe`](Self::unsubscribe) or on drop. After release, [`recv`](Self::recv)
/// returns `None` even if snapshots were still buffered.
pub struct Subscription {
    snapshots: mpsc::UnboundedReceiver<Snapshot>,
    release: Option<ReleaseHook>,
}

impl Subscription {
    /// Wraps a snapshot receiver and the hook that detaches it from the store.
    pub fn new(
        snapshots: mpsc::UnboundedReceiver<Snapshot>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            snapshots,
            release: Some(Box::new(release)),
        }
    }

    /// Waits for the next snapshot.
    ///
    /// Returns `None` once the subscription is released or the store has
    /// dropped its sending side.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        if self.release.is_none() {
            return None;
        }
        self.snapshots.recv().await
    }

    /// Releases the subscription.
    ///
    /// Returns `true` if this call performed the release, `false` if it had
    /// already happened.
    pub fn unsubscribe(&mut self) -> bool {
        let Some(release) = self.release.take() else {
            return false;
        };
        self.snapshots.close();
        release();
        true
    }

    /// Returns `true` until the subscription is released.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.release.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}
