//! Local materialized view of the shared task collection.
//!
//! [`ViewStore`] holds the latest feed snapshot as an immutable
//! [`BoardView`] behind an `Arc`. Applying a snapshot builds the new view
//! under an upgradable read lock and only takes the write lock to swap the
//! pointer, so readers always see one complete snapshot. Only the change feed
//! writes here; renderers can watch the version counter to know when to
//! re-project.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use tokio::sync::watch;

use taskify_model::{Task, TaskId};

use crate::store::Snapshot;

/// Errors that cause a snapshot to be rejected.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ViewError {
    /// The snapshot listed the same task twice.
    #[error("snapshot contains task {0} more than once")]
    DuplicateTaskId(TaskId),
}

/// One complete, immutable snapshot of the board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardView {
    /// Tasks in feed order (newest first).
    tasks: Vec<Task>,
    /// Task ID -> position in `tasks`.
    index: HashMap<TaskId, usize>,
    /// Incremented on every effective change.
    version: u64,
}

impl BoardView {
    fn from_snapshot(tasks: Snapshot, version: u64) -> Result<Self, ViewError> {
        let mut index = HashMap::with_capacity(tasks.len());
        for (position, task) in tasks.iter().enumerate() {
            if index.insert(task.id, position).is_some() {
                return Err(ViewError::DuplicateTaskId(task.id));
            }
        }
        Ok(Self {
            tasks,
            index,
            version,
        })
    }

    /// Looks up a task by identifier.
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.index.get(&id).and_then(|&i| self.tasks.get(i))
    }

    /// Returns `true` if the task is in the view.
    #[must_use]
    pub fn contains(&self, id: TaskId) -> bool {
        self.index.contains_key(&id)
    }

    /// Tasks in display order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Iterates tasks in display order.
    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` if the board has no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Version of this snapshot; `0` before the first non-empty snapshot.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }
}

impl<'a> IntoIterator for &'a BoardView {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Result of [`ViewStore::apply_snapshot`].
#[derive(Debug, Clone)]
pub enum Applied {
    /// The snapshot matched the current view; nothing changed.
    Unchanged,
    /// The view was replaced.
    Replaced {
        /// View before the swap.
        previous: Arc<BoardView>,
        /// View after the swap.
        current: Arc<BoardView>,
    },
}

/// Holder of the current [`BoardView`].
#[derive(Debug)]
pub struct ViewStore {
    current: RwLock<Arc<BoardView>>,
    /// Publishes the version of every view swapped in.
    changes: watch::Sender<u64>,
}

impl Default for ViewStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewStore {
    /// Creates a store holding an empty board.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            current: RwLock::new(Arc::new(BoardView::default())),
            changes,
        }
    }

    /// Returns a receiver that is notified whenever the view is replaced.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Returns the current view. Never waits for a snapshot build, only for
    /// the pointer swap that ends one.
    #[must_use]
    pub fn get(&self) -> Arc<BoardView> {
        Arc::clone(&self.current.read())
    }

    /// Replaces the view with `snapshot`.
    ///
    /// A snapshot identical to the current content is a no-op, so duplicate
    /// deliveries are harmless.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::DuplicateTaskId`] if the snapshot repeats an
    /// identifier; the previous view is kept.
    pub fn apply_snapshot(&self, snapshot: Snapshot) -> Result<Applied, ViewError> {
        // Readers proceed while the new view is built; other writers wait.
        let current = self.current.upgradable_read();
        if current.tasks == snapshot {
            return Ok(Applied::Unchanged);
        }
        let next = Arc::new(BoardView::from_snapshot(snapshot, current.version + 1)?);
        let mut current = RwLockUpgradableReadGuard::upgrade(current);
        let previous = std::mem::replace(&mut *current, Arc::clone(&next));
        drop(current);
        self.changes.send_replace(next.version);
        Ok(Applied::Replaced {
            previous,
            current: next,
        })
    }
}
