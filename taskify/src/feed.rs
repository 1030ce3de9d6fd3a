//! Change feed adapter between the backing store and the local view.
//!
//! The adapter owns the store [`Subscription`] and runs on a single tokio
//! task, so snapshots are applied one at a time and in the order the store
//! emitted them. Each applied snapshot is turned into discrete
//! [`FeedEvent`]s for consumers that want fine-grained updates.
//!
//! # Architecture
//!
//! ```text
//! BackingStore ── Snapshot ──> ChangeFeed task ──> ViewStore
//!                                     └──── FeedEvent ───> UI
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use taskify_model::{Task, TaskId};

use crate::board::view::{Applied, BoardView, ViewStore};
use crate::store::{BackingStore, Snapshot, StoreError, Subscription};

/// A discrete change between two consecutive views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// A task appeared.
    Added(Task),
    /// A task's title or status changed.
    Updated {
        /// The task as previously shown.
        before: Task,
        /// The task as now shown.
        after: Task,
    },
    /// A task disappeared.
    Removed(Task),
    /// Tasks present in both views changed relative order.
    Reordered,
}

/// Computes the events that turn `previous` into `current`.
///
/// Additions and updates are listed in `current` order, removals in
/// `previous` order, and a single `Reordered` comes last if needed.
#[must_use]
pub fn diff(previous: &BoardView, current: &BoardView) -> Vec<FeedEvent> {
    let mut events = Vec::new();

    for task in current {
        match previous.get(task.id) {
            None => events.push(FeedEvent::Added(task.clone())),
            Some(before) if before != task => events.push(FeedEvent::Updated {
                before: before.clone(),
                after: task.clone(),
            }),
            Some(_) => {}
        }
    }

    for task in previous {
        if !current.contains(task.id) {
            events.push(FeedEvent::Removed(task.clone()));
        }
    }

    let kept_before: Vec<TaskId> = previous
        .iter()
        .map(|t| t.id)
        .filter(|id| current.contains(*id))
        .collect();
    let kept: HashSet<TaskId> = kept_before.iter().copied().collect();
    let kept_after = current.iter().map(|t| t.id).filter(|id| kept.contains(id));
    if !kept_before.iter().copied().eq(kept_after) {
        events.push(FeedEvent::Reordered);
    }

    events
}

/// Feeds store snapshots into a [`ViewStore`].
pub struct ChangeFeed {
    view: Arc<ViewStore>,
    events: Option<mpsc::Sender<FeedEvent>>,
}

impl ChangeFeed {
    /// Creates a feed that writes into `view`.
    #[must_use]
    pub const fn new(view: Arc<ViewStore>) -> Self {
        Self { view, events: None }
    }

    /// Publishes [`FeedEvent`]s to `events` after each applied snapshot.
    ///
    /// Delivery is best-effort: events are dropped if the channel is full.
    #[must_use]
    pub fn with_events(mut self, events: mpsc::Sender<FeedEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Subscribes to `store` and starts applying snapshots.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the subscription cannot be opened.
    pub async fn start<S: BackingStore>(self, store: &S) -> Result<FeedHandle, StoreError> {
        let subscription = store.subscribe().await?;
        Ok(self.spawn(subscription))
    }

    /// Starts applying snapshots from an already-open subscription.
    #[must_use]
    pub fn spawn(self, subscription: Subscription) -> FeedHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(subscription, shutdown_rx));
        tracing::info!("change feed started");
        FeedHandle {
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    async fn run(self, mut subscription: Subscription, mut shutdown: oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                next = subscription.recv() => match next {
                    Some(snapshot) => self.apply(snapshot),
                    None => {
                        tracing::warn!("change feed closed by the store");
                        break;
                    }
                },
            }
        }
        subscription.unsubscribe();
        tracing::info!("change feed stopped");
    }

    /// Applies one snapshot and publishes the resulting events.
    fn apply(&self, snapshot: Snapshot) {
        let count = snapshot.len();
        match self.view.apply_snapshot(snapshot) {
            Ok(Applied::Unchanged) => {
                tracing::debug!(tasks = count, "duplicate snapshot ignored");
            }
            Ok(Applied::Replaced { previous, current }) => {
                tracing::debug!(
                    tasks = count,
                    version = current.version(),
                    "snapshot applied"
                );
                if let Some(events) = &self.events {
                    publish(events, diff(&previous, &current));
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "snapshot rejected, keeping previous view");
            }
        }
    }
}

/// Sends events without waiting; a full or closed channel drops them.
fn publish(events: &mpsc::Sender<FeedEvent>, batch: Vec<FeedEvent>) {
    for event in batch {
        match events.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("feed event channel full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => return,
        }
    }
}

/// Handle to a running change feed.
///
/// Stopping is idempotent; dropping the handle also stops the feed. Once
/// stopped, the feed task releases its subscription and applies nothing more.
#[derive(Debug)]
pub struct FeedHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl FeedHandle {
    /// Stops the feed and waits for its task to finish.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(err) = task.await
        {
            tracing::warn!(error = %err, "change feed task ended abnormally");
        }
    }

    /// Returns `true` while the feed task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
