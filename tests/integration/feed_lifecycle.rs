//! Integration tests for the change feed lifecycle.
//!
//! Covers subscription release, duplicate and malformed snapshots, and the
//! store closing the feed.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

use taskify::board::ViewStore;
use taskify::feed::{ChangeFeed, FeedEvent};
use taskify::store::memory::InMemoryBackingStore;
use taskify::store::{BackingStore, NewTask, Snapshot, Subscription};
use taskify_model::{Task, TaskId, TaskPatch, TaskStatus};

fn make_task(title: &str, created_at: u64) -> Task {
    Task {
        id: TaskId::new(),
        title: title.to_string(),
        status: TaskStatus::Todo,
        created_at,
    }
}

fn new_task(title: &str) -> NewTask {
    NewTask {
        title: title.to_string(),
        status: TaskStatus::Todo,
    }
}

/// A hand-driven subscription plus a count of how often it was released.
fn manual_subscription() -> (mpsc::UnboundedSender<Snapshot>, Subscription, Arc<AtomicUsize>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let released = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&released);
    let sub = Subscription::new(rx, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (tx, sub, released)
}

async fn next_event(rx: &mut mpsc::Receiver<FeedEvent>) -> FeedEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for feed event")
        .expect("feed event channel closed")
}

#[tokio::test]
async fn feed_mirrors_store_changes_as_events() {
    let store = InMemoryBackingStore::new();
    let view = Arc::new(ViewStore::new());
    let (tx, mut events) = mpsc::channel(16);
    let mut handle = ChangeFeed::new(Arc::clone(&view))
        .with_events(tx)
        .start(&store)
        .await
        .unwrap();

    let id = store.insert(new_task("write tests")).await.unwrap();
    let FeedEvent::Added(added) = next_event(&mut events).await else {
        panic!("expected Added");
    };
    assert_eq!(added.id, id);

    store
        .update_fields(id, TaskPatch::status(TaskStatus::InProcess))
        .await
        .unwrap();
    let FeedEvent::Updated { before, after } = next_event(&mut events).await else {
        panic!("expected Updated");
    };
    assert_eq!(before.status, TaskStatus::Todo);
    assert_eq!(after.status, TaskStatus::InProcess);

    store.delete(id).await.unwrap();
    assert!(matches!(next_event(&mut events).await, FeedEvent::Removed(t) if t.id == id));
    assert!(view.get().is_empty());

    handle.shutdown().await;
}

#[tokio::test]
async fn teardown_is_idempotent_and_releases_once() {
    let view = Arc::new(ViewStore::new());
    let (_tx, sub, released) = manual_subscription();
    let mut handle = ChangeFeed::new(view).spawn(sub);

    handle.shutdown().await;
    handle.shutdown().await;
    drop(handle);

    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn no_snapshots_are_applied_after_teardown() {
    let store = InMemoryBackingStore::new();
    let view = Arc::new(ViewStore::new());
    let mut handle = ChangeFeed::new(Arc::clone(&view)).start(&store).await.unwrap();
    assert_eq!(store.subscriber_count(), 1);

    handle.shutdown().await;
    assert_eq!(store.subscriber_count(), 0);

    let version = view.get().version();
    store.insert(new_task("unseen")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(view.get().version(), version);
    assert!(view.get().is_empty());
}

#[tokio::test]
async fn dropping_the_handle_stops_the_feed() {
    let view = Arc::new(ViewStore::new());
    let (tx, sub, released) = manual_subscription();
    let handle = ChangeFeed::new(Arc::clone(&view)).spawn(sub);
    drop(handle);

    tokio::time::timeout(Duration::from_secs(2), async {
        while released.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    // Sending side observes the closed receiver.
    assert!(tx.send(vec![make_task("late", 1)]).is_err());
    assert!(view.get().is_empty());
}

#[tokio::test]
async fn duplicate_snapshot_is_a_no_op() {
    let view = Arc::new(ViewStore::new());
    let (tx, sub, _released) = manual_subscription();
    let (event_tx, mut events) = mpsc::channel(16);
    let mut handle = ChangeFeed::new(Arc::clone(&view))
        .with_events(event_tx)
        .spawn(sub);

    let snapshot = vec![make_task("a", 2), make_task("b", 1)];
    tx.send(snapshot.clone()).unwrap();
    tx.send(snapshot.clone()).unwrap();
    // A marker snapshot after the duplicate proves it was processed.
    let marker = make_task("marker", 3);
    let mut with_marker = vec![marker.clone()];
    with_marker.extend(snapshot);
    tx.send(with_marker).unwrap();

    assert!(matches!(next_event(&mut events).await, FeedEvent::Added(_)));
    assert!(matches!(next_event(&mut events).await, FeedEvent::Added(_)));
    assert_eq!(next_event(&mut events).await, FeedEvent::Added(marker));
    assert_eq!(view.get().version(), 2);

    handle.shutdown().await;
}

#[tokio::test]
async fn snapshot_with_duplicate_ids_keeps_previous_view() {
    let view = Arc::new(ViewStore::new());
    let (tx, sub, _released) = manual_subscription();
    let (event_tx, mut events) = mpsc::channel(16);
    let mut handle = ChangeFeed::new(Arc::clone(&view))
        .with_events(event_tx)
        .spawn(sub);

    let good = make_task("good", 1);
    tx.send(vec![good.clone()]).unwrap();
    assert_eq!(next_event(&mut events).await, FeedEvent::Added(good.clone()));

    let dup = make_task("dup", 2);
    tx.send(vec![dup.clone(), dup, good.clone()]).unwrap();
    let next = make_task("next", 3);
    tx.send(vec![next.clone(), good.clone()]).unwrap();

    // The malformed snapshot produced nothing; the following one applies.
    assert_eq!(next_event(&mut events).await, FeedEvent::Added(next));
    assert_eq!(view.get().version(), 2);

    handle.shutdown().await;
}

#[tokio::test]
async fn store_closing_the_feed_stops_the_adapter() {
    let store = InMemoryBackingStore::new();
    let view = Arc::new(ViewStore::new());
    let mut handle = ChangeFeed::new(Arc::clone(&view)).start(&store).await.unwrap();

    store.insert(new_task("before close")).await.unwrap();
    store.close_subscriptions();

    tokio::time::timeout(Duration::from_secs(2), async {
        while handle.is_running() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    // No resubscription happens; later changes stay invisible.
    assert_eq!(store.subscriber_count(), 0);
    let seen = view.get();
    store.insert(new_task("after close")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(view.get(), seen);

    handle.shutdown().await;
}
