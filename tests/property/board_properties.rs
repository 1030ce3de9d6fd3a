//! Property-based tests for the board engine.
//!
//! Uses proptest to verify:
//! 1. `resolve` is total and never moves a task backwards or out of `complete`.
//! 2. `project` partitions the view: every task lands in exactly its column.
//! 3. Applying the same snapshot twice equals applying it once.
//! 4. `diff` between two views accounts for every task.
//! 5. Title normalization trims and rejects blank input.
//! 6. Creating a task through a running client adds exactly one trimmed
//!    `todo` task; a blank title issues no store command.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use taskify::app::{App, UiEvent};
use taskify::board::{Applied, BoardError, ViewStore, project, resolve};
use taskify::config::ClientConfig;
use taskify::feed::{FeedEvent, diff};
use taskify::store::memory::InMemoryBackingStore;
use taskify::store::{BackingStore, NewTask};
use taskify_model::{Task, TaskId, TaskStatus, ValidationError, is_valid_title, normalize_title};
use uuid::Uuid;

// --- Strategies ---

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Todo),
        Just(TaskStatus::InProcess),
        Just(TaskStatus::Complete),
    ]
}

fn arb_task() -> impl Strategy<Value = Task> {
    (any::<u128>(), "[a-zA-Z0-9 ]{1,32}", arb_status(), any::<u64>()).prop_map(
        |(n, title, status, created_at)| Task {
            id: TaskId::from_uuid(Uuid::from_u128(n)),
            title,
            status,
            created_at,
        },
    )
}

/// Snapshots with unique ids, newest first.
fn arb_snapshot() -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec(arb_task(), 0..24).prop_map(|tasks| {
        let mut seen = HashSet::new();
        let mut unique: Vec<Task> = tasks.into_iter().filter(|t| seen.insert(t.id)).collect();
        unique.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        unique
    })
}

fn arb_core_title() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9 ]{0,30}[a-zA-Z0-9]|[a-zA-Z0-9]"
}

fn arb_padding() -> impl Strategy<Value = String> {
    "[ \t\n]{0,4}"
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Starts a client on a store already holding one task.
async fn seeded_client() -> (Arc<InMemoryBackingStore>, App<InMemoryBackingStore>) {
    let store = Arc::new(InMemoryBackingStore::new());
    store
        .insert(NewTask {
            title: "existing".to_string(),
            status: TaskStatus::InProcess,
        })
        .await
        .unwrap();
    let (app, _channels) = App::start(Arc::clone(&store), &ClientConfig::default())
        .await
        .unwrap();
    let mut changes = app.watch();
    tokio::time::timeout(Duration::from_secs(2), async {
        while app.view().is_empty() {
            changes.changed().await.unwrap();
        }
    })
    .await
    .unwrap();
    (store, app)
}

proptest! {
    #[test]
    fn resolve_is_total_and_monotonic(source in arb_status(), target in arb_status()) {
        match resolve(source, target) {
            Some(next) => {
                prop_assert!(!source.is_terminal());
                prop_assert!(next >= source);
                prop_assert_ne!(next, TaskStatus::Todo);
            }
            None => prop_assert!(source.is_terminal() || source == target),
        }
    }

    #[test]
    fn project_partitions_the_view(snapshot in arb_snapshot()) {
        let store = ViewStore::new();
        store.apply_snapshot(snapshot.clone()).unwrap();
        let view = store.get();
        let columns = project(&view);

        prop_assert_eq!(columns.len(), snapshot.len());
        for (status, tasks) in columns.iter() {
            prop_assert!(tasks.iter().all(|t| t.status == status));
            // Order within a column follows the view.
            let expected: Vec<&Task> = snapshot.iter().filter(|t| t.status == status).collect();
            let actual: Vec<&Task> = tasks.iter().collect();
            prop_assert_eq!(actual, expected);
        }
    }

    #[test]
    fn applying_a_snapshot_twice_equals_once(snapshot in arb_snapshot()) {
        let store = ViewStore::new();
        store.apply_snapshot(snapshot.clone()).unwrap();
        let once = store.get();

        let applied = store.apply_snapshot(snapshot).unwrap();
        prop_assert!(matches!(applied, Applied::Unchanged));
        prop_assert_eq!(store.get(), once);
    }

    #[test]
    fn diff_accounts_for_every_task(before in arb_snapshot(), after in arb_snapshot()) {
        let store = ViewStore::new();
        store.apply_snapshot(before.clone()).unwrap();
        let previous = store.get();
        store.apply_snapshot(after.clone()).unwrap();
        let current = store.get();

        let events = diff(&previous, &current);
        let added: HashSet<TaskId> = events
            .iter()
            .filter_map(|e| match e {
                FeedEvent::Added(t) => Some(t.id),
                _ => None,
            })
            .collect();
        let removed: HashSet<TaskId> = events
            .iter()
            .filter_map(|e| match e {
                FeedEvent::Removed(t) => Some(t.id),
                _ => None,
            })
            .collect();

        let before_ids: HashSet<TaskId> = before.iter().map(|t| t.id).collect();
        let after_ids: HashSet<TaskId> = after.iter().map(|t| t.id).collect();
        prop_assert_eq!(added, &after_ids - &before_ids);
        prop_assert_eq!(removed, &before_ids - &after_ids);
        prop_assert!(events.iter().filter(|e| matches!(e, FeedEvent::Reordered)).count() <= 1);
    }

    #[test]
    fn normalize_title_trims(
        core in arb_core_title(),
        pad_left in arb_padding(),
        pad_right in arb_padding(),
    ) {
        let raw = format!("{pad_left}{core}{pad_right}");
        prop_assert!(is_valid_title(&raw));
        prop_assert_eq!(normalize_title(&raw).unwrap(), core);
    }

    #[test]
    fn blank_titles_are_rejected(blank in "[ \t\n\r]{0,16}") {
        prop_assert!(!is_valid_title(&blank));
        prop_assert_eq!(normalize_title(&blank), Err(ValidationError::EmptyTitle));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn create_adds_one_trimmed_todo_task(
        core in arb_core_title(),
        pad_left in arb_padding(),
        pad_right in arb_padding(),
    ) {
        let raw = format!("{pad_left}{core}{pad_right}");
        let (before, after) = runtime().block_on(async {
            let (_store, mut app) = seeded_client().await;
            let before = app.view();
            let mut changes = app.watch();
            app.dispatch(UiEvent::AddSubmit(raw)).await.unwrap();
            tokio::time::timeout(Duration::from_secs(2), async {
                while app.view().len() == before.len() {
                    changes.changed().await.unwrap();
                }
            })
            .await
            .unwrap();
            let after = app.view();
            app.shutdown().await;
            (before, after)
        });

        prop_assert_eq!(after.len(), before.len() + 1);
        let added: Vec<&Task> = after.iter().filter(|t| !before.contains(t.id)).collect();
        prop_assert_eq!(added.len(), 1);
        prop_assert_eq!(added[0].status, TaskStatus::Todo);
        prop_assert_eq!(&added[0].title, &core);
    }

    #[test]
    fn blank_create_issues_no_command(blank in "[ \t\n\r]{0,16}") {
        let (issued_before, issued_after, result, len) = runtime().block_on(async {
            let (store, mut app) = seeded_client().await;
            let issued_before = store.commands_issued();
            let result = app.dispatch(UiEvent::AddSubmit(blank)).await;
            tokio::task::yield_now().await;
            let len = app.view().len();
            app.shutdown().await;
            (issued_before, store.commands_issued(), result, len)
        });

        prop_assert!(matches!(
            result,
            Err(BoardError::Validation(ValidationError::EmptyTitle))
        ));
        prop_assert_eq!(issued_after, issued_before);
        prop_assert_eq!(len, 1);
    }
}
