//! Board client: wires the change feed, view store, and gateway together.
//!
//! [`App`] is the composition root a renderer talks to. It turns UI events
//! into intents (consulting the drag-drop resolver for drops), hands them to
//! the [`MutationGateway`], and exposes the projected columns of the local
//! view. The view itself is only written by the change feed.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use taskify_model::{DragPayload, TaskAction, TaskId, TaskStatus};

use crate::board::{
    BoardError, BoardView, Columns, Intent, MutationGateway, Outcome, ViewStore, can_drop, project,
    resolve,
};
use crate::config::ClientConfig;
use crate::feed::{ChangeFeed, FeedEvent, FeedHandle};
use crate::store::{BackingStore, StoreError};

/// Events a renderer reports to the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// A card was picked up.
    DragStart(TaskId),
    /// A card was released over a column.
    DropOn {
        /// Column the card was released on.
        target: TaskStatus,
        /// Payload captured at drag start.
        payload: DragPayload,
    },
    /// The "move to in process" action was clicked.
    MoveToInProcess(TaskId),
    /// The "move to complete" action was clicked.
    MoveToComplete(TaskId),
    /// An inline title edit was confirmed.
    EditConfirm {
        /// Task being edited.
        id: TaskId,
        /// Text as typed.
        text: String,
    },
    /// The delete button was clicked.
    DeleteClick(TaskId),
    /// The add-task form was submitted.
    AddSubmit(String),
}

/// Receivers handed out by [`App::start`].
#[derive(Debug)]
pub struct AppChannels {
    /// Failures of commands issued through [`App::submit`].
    pub errors: mpsc::Receiver<BoardError>,
    /// Fine-grained changes derived from each applied snapshot.
    pub events: mpsc::Receiver<FeedEvent>,
}

/// One client's view of the shared board.
pub struct App<S: BackingStore + 'static> {
    view: Arc<ViewStore>,
    gateway: MutationGateway<S>,
    feed: FeedHandle,
    dragging: Option<DragPayload>,
    error_tx: mpsc::Sender<BoardError>,
    client_name: String,
}

impl<S: BackingStore + 'static> App<S> {
    /// Subscribes to `store` and starts mirroring it into a fresh view.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the feed subscription cannot be opened.
    pub async fn start(
        store: Arc<S>,
        config: &ClientConfig,
    ) -> Result<(Self, AppChannels), StoreError> {
        let view = Arc::new(ViewStore::new());
        let (event_tx, events) = mpsc::channel(config.event_buffer);
        let (error_tx, errors) = mpsc::channel(config.error_buffer);

        let feed = ChangeFeed::new(Arc::clone(&view))
            .with_events(event_tx)
            .start(store.as_ref())
            .await?;
        let gateway = MutationGateway::new(store, Arc::clone(&view));

        tracing::info!(client = %config.client_name, "board client started");

        let app = Self {
            view,
            gateway,
            feed,
            dragging: None,
            error_tx,
            client_name: config.client_name.clone(),
        };
        Ok((app, AppChannels { errors, events }))
    }

    /// Handles `event` and waits for the store command to finish.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Validation`] for invalid input,
    /// [`BoardError::NotFound`] for a drag of an unknown card or a command
    /// the store rejects as missing, and [`BoardError::Transport`] for other
    /// store failures.
    pub async fn dispatch(&mut self, event: UiEvent) -> Result<Outcome, BoardError> {
        match self.intent_for(event)? {
            Some(intent) => self.gateway.handle(intent).await,
            None => Ok(Outcome::Unchanged),
        }
    }

    /// Handles `event` without waiting for the store.
    ///
    /// Validation and no-op detection happen before this returns; the store
    /// command then runs on a spawned task. A failing command is logged and
    /// reported on [`AppChannels::errors`].
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Validation`] for invalid input and
    /// [`BoardError::NotFound`] for a drag of an unknown card.
    pub fn submit(&mut self, event: UiEvent) -> Result<Outcome, BoardError> {
        let Some(intent) = self.intent_for(event)? else {
            return Ok(Outcome::Unchanged);
        };
        let Some(command) = self.gateway.prepare(intent)? else {
            return Ok(Outcome::Unchanged);
        };

        let gateway = self.gateway.clone();
        let errors = self.error_tx.clone();
        tokio::spawn(async move {
            if let Err(err) = gateway.execute(command).await {
                match errors.try_send(err) {
                    Ok(()) | Err(mpsc::error::TrySendError::Closed(_)) => {}
                    Err(mpsc::error::TrySendError::Full(err)) => {
                        tracing::warn!(error = %err, "error channel full, dropping report");
                    }
                }
            }
        });
        Ok(Outcome::Pending)
    }

    /// Maps a UI event to the intent it asks for, if any.
    fn intent_for(&mut self, event: UiEvent) -> Result<Option<Intent>, BoardError> {
        let intent = match event {
            UiEvent::DragStart(id) => {
                let view = self.view.get();
                let task = view.get(id).ok_or(BoardError::NotFound(id))?;
                tracing::debug!(task_id = %id, status = %task.status, "drag started");
                self.dragging = Some(task.drag_payload());
                return Ok(None);
            }
            UiEvent::DropOn { target, payload } => {
                self.dragging = None;
                return Ok(self.resolve_drop(&payload, target));
            }
            UiEvent::MoveToInProcess(id) => Intent::Move {
                id,
                status: TaskAction::MoveToInProcess.target(),
            },
            UiEvent::MoveToComplete(id) => Intent::Move {
                id,
                status: TaskAction::MoveToComplete.target(),
            },
            UiEvent::EditConfirm { id, text } => Intent::Rename { id, title: text },
            UiEvent::DeleteClick(id) => Intent::Delete { id },
            UiEvent::AddSubmit(text) => Intent::Create { title: text },
        };
        Ok(Some(intent))
    }

    /// Decides the move a drop produces.
    ///
    /// The task's status in the current view wins over the payload's, which
    /// may predate a remote change.
    fn resolve_drop(&self, payload: &DragPayload, target: TaskStatus) -> Option<Intent> {
        if !can_drop(payload, target) {
            tracing::debug!(task_id = %payload.id, %target, "dropped on its own column");
            return None;
        }
        let source = self
            .view
            .get()
            .get(payload.id)
            .map_or(payload.status, |task| task.status);
        let Some(status) = resolve(source, target) else {
            tracing::debug!(task_id = %payload.id, %source, %target, "drop ignored");
            return None;
        };
        Some(Intent::Move {
            id: payload.id,
            status,
        })
    }

    /// The current view projected into board columns.
    #[must_use]
    pub fn columns(&self) -> Columns {
        project(&self.view.get())
    }

    /// The current view.
    #[must_use]
    pub fn view(&self) -> Arc<BoardView> {
        self.view.get()
    }

    /// Notified with the new version whenever the feed replaces the view.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.view.watch()
    }

    /// The payload of the card being dragged, if any.
    #[must_use]
    pub const fn dragging(&self) -> Option<&DragPayload> {
        self.dragging.as_ref()
    }

    /// Stops the change feed. In-flight commands are left to finish.
    pub async fn shutdown(&mut self) {
        self.feed.shutdown().await;
        tracing::info!(client = %self.client_name, "board client stopped");
    }
}
