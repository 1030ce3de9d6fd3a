//! In-process backing store.
//!
//! [`InMemoryBackingStore`] keeps the collection in a `HashMap` behind a
//! `parking_lot::Mutex` and pushes a fresh snapshot to every subscriber after
//! each successful command. Clones share the same collection, so several
//! clients in one process see each other's changes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use taskify_model::{Task, TaskId, TaskPatch};

use super::{BackingStore, NewTask, Snapshot, StoreError, Subscription};

/// Shared in-memory task collection with live snapshot subscriptions.
#[derive(Clone, Default)]
pub struct InMemoryBackingStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<StoreState>,
    /// Number of insert/update/delete commands received, successful or not.
    commands: AtomicU64,
    /// Fault injection: when set, every command fails with `Unavailable`.
    unavailable: AtomicBool,
}

#[derive(Default)]
struct StoreState {
    tasks: HashMap<TaskId, Task>,
    subscribers: HashMap<u64, mpsc::UnboundedSender<Snapshot>>,
    next_subscriber: u64,
    last_created_at: u64,
}

impl StoreState {
    /// Builds the current snapshot, newest first.
    fn snapshot(&self) -> Snapshot {
        let mut tasks: Vec<Task> = self.tasks.values().cloned().collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        tasks
    }

    /// Pushes the current snapshot to every live subscriber.
    fn publish(&mut self) {
        let snapshot = self.snapshot();
        self.subscribers.retain(|_, tx| tx.send(snapshot.clone()).is_ok());
    }

    /// Returns a creation time strictly greater than any handed out before.
    fn next_created_at(&mut self) -> u64 {
        let now = now_ms();
        self.last_created_at = now.max(self.last_created_at.saturating_add(1));
        self.last_created_at
    }
}

/// Returns the current timestamp in milliseconds since epoch.
fn now_ms() -> u64 {
    u64::try_from(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis(),
    )
    .unwrap_or(u64::MAX)
}

impl InMemoryBackingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent command fail with [`StoreError::Unavailable`]
    /// (or succeed again when `false`).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns how many insert/update/delete commands have been received.
    #[must_use]
    pub fn commands_issued(&self) -> u64 {
        self.inner.commands.load(Ordering::SeqCst)
    }

    /// Returns the number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.state.lock().subscribers.len()
    }

    /// Returns a copy of the stored task, if present.
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<Task> {
        self.inner.state.lock().tasks.get(&id).cloned()
    }

    /// Returns the current snapshot without subscribing.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.inner.state.lock().snapshot()
    }

    /// Drops the sending side of every subscription, as a store does when it
    /// terminates live queries. Subscribers see their feed end.
    pub fn close_subscriptions(&self) {
        let closed = std::mem::take(&mut self.inner.state.lock().subscribers);
        tracing::info!(count = closed.len(), "closing store subscriptions");
    }

    /// Counts the command and applies fault injection.
    fn begin_command(&self) -> Result<(), StoreError> {
        self.inner.commands.fetch_add(1, Ordering::SeqCst);
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store marked unavailable".to_string()));
        }
        Ok(())
    }

    fn release_hook(inner: Weak<Inner>, subscriber: u64) -> impl FnOnce() + Send + 'static {
        move || {
            if let Some(inner) = inner.upgrade() {
                inner.state.lock().subscribers.remove(&subscriber);
            }
        }
    }
}

impl BackingStore for InMemoryBackingStore {
    async fn subscribe(&self) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = {
            let mut state = self.inner.state.lock();
            let subscriber = state.next_subscriber;
            state.next_subscriber += 1;
            tx.send(state.snapshot()).map_err(|_| StoreError::Closed)?;
            state.subscribers.insert(subscriber, tx);
            subscriber
        };
        tracing::debug!(subscriber, "store subscription opened");
        Ok(Subscription::new(
            rx,
            Self::release_hook(Arc::downgrade(&self.inner), subscriber),
        ))
    }

    async fn insert(&self, task: NewTask) -> Result<TaskId, StoreError> {
        self.begin_command()?;
        let mut state = self.inner.state.lock();
        let id = TaskId::new();
        let created_at = state.next_created_at();
        state.tasks.insert(
            id,
            Task {
                id,
                title: task.title,
                status: task.status,
                created_at,
            },
        );
        state.publish();
        drop(state);
        Ok(id)
    }

    async fn update_fields(&self, id: TaskId, patch: TaskPatch) -> Result<(), StoreError> {
        self.begin_command()?;
        let mut state = self.inner.state.lock();
        let task = state.tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if patch.is_empty() {
            tracing::debug!(task_id = %id, "empty patch, nothing published");
            return Ok(());
        }
        patch.apply_to(task);
        state.publish();
        drop(state);
        Ok(())
    }

    async fn delete(&self, id: TaskId) -> Result<(), StoreError> {
        self.begin_command()?;
        let mut state = self.inner.state.lock();
        if state.tasks.remove(&id).is_none() {
            return Err(StoreError::NotFound(id));
        }
        state.publish();
        drop(state);
        Ok(())
    }
}
