//! `Taskify`, a collaborative task board.
//!
//! Runs a board client against an in-process store and reads commands from
//! stdin. The `remote-*` commands change the store directly, the way another
//! client would. Configuration via CLI flags, environment variables, or
//! config file (`~/.config/taskify/config.toml`).
//!
//! ```bash
//! cargo run --bin taskify
//!
//! # Verbose logs to a custom file
//! TASKIFY_LOG=debug cargo run --bin taskify -- --log-file ./taskify.log
//! ```

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_appender::non_blocking::WorkerGuard;

use taskify::app::{App, AppChannels, UiEvent};
use taskify::board::{BoardError, Outcome};
use taskify::cli::{self, Command, CommandError};
use taskify::config::{CliArgs, ClientConfig};
use taskify::feed::FeedEvent;
use taskify::store::memory::InMemoryBackingStore;
use taskify::store::{BackingStore, StoreError};
use taskify_model::{TaskAction, TaskPatch, ValidationError, normalize_title};

/// Errors reported back to the prompt. None of them end the session.
#[derive(Debug, thiserror::Error)]
enum ReplError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("export failed: {0}")]
    Export(#[from] serde_json::Error),
    #[error("no card is being dragged (use `drag <id>` first)")]
    NotDragging,
}

type Board = App<InMemoryBackingStore>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    // Load and resolve configuration (CLI args > config file > defaults).
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Logs go to a file; stdout belongs to the prompt.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!(client = %config.client_name, "taskify starting");

    let store = Arc::new(InMemoryBackingStore::new());
    let (mut app, mut channels) = App::start(Arc::clone(&store), &config)
        .await
        .map_err(io::Error::other)?;

    let result = run(&mut app, &store, &mut channels, &config).await;

    app.shutdown().await;
    tracing::info!("taskify exiting");
    result
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskify.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Prompt loop: one command per line until `quit` or end of input.
async fn run(
    app: &mut Board,
    store: &InMemoryBackingStore,
    channels: &mut AppChannels,
    config: &ClientConfig,
) -> io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut changes = app.watch();
    println!("{}", cli::HELP);

    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };

        let command = match cli::parse(&line) {
            Ok(Some(Command::Quit)) => return Ok(()),
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("error: {e}");
                continue;
            }
        };

        changes.borrow_and_update();
        match execute(app, store, command, config).await {
            Ok(true) => settle(&mut changes, config.settle_timeout).await,
            Ok(false) => {}
            Err(e) => println!("error: {e}"),
        }
        drain(channels);
    }
}

/// Runs one command. Returns `true` if a store command was issued and the
/// board is expected to change.
async fn execute(
    app: &mut Board,
    store: &InMemoryBackingStore,
    command: Command,
    config: &ClientConfig,
) -> Result<bool, ReplError> {
    let view = app.view();
    let mut changes_board = true;
    let event = match command {
        Command::Add(title) => UiEvent::AddSubmit(title),
        Command::Rename { id, title } => UiEvent::EditConfirm {
            id: cli::resolve_id(&view, &id)?,
            text: title,
        },
        Command::Move { id, status } => {
            let id = cli::resolve_id(&view, &id)?;
            match cli::action_for(&view, id, status)? {
                TaskAction::MoveToInProcess => UiEvent::MoveToInProcess(id),
                TaskAction::MoveToComplete => UiEvent::MoveToComplete(id),
            }
        }
        Command::Drag(id) => UiEvent::DragStart(cli::resolve_id(&view, &id)?),
        Command::Drop(target) => {
            let payload = app.dragging().cloned().ok_or(ReplError::NotDragging)?;
            changes_board = cli::drop_moves_card(&view, &payload, target);
            UiEvent::DropOn { target, payload }
        }
        Command::Delete(id) => UiEvent::DeleteClick(cli::resolve_id(&view, &id)?),
        Command::Show => {
            print!("{}", cli::render(&app.columns(), &config.timestamp_format));
            return Ok(false);
        }
        Command::Export => {
            println!("{}", serde_json::to_string_pretty(view.tasks())?);
            return Ok(false);
        }
        Command::RemoteDelete(id) => {
            store.delete(cli::resolve_id(&view, &id)?).await?;
            return Ok(true);
        }
        Command::RemoteRename { id, title } => {
            let id = cli::resolve_id(&view, &id)?;
            store
                .update_fields(id, TaskPatch::title(normalize_title(&title)?))
                .await?;
            return Ok(true);
        }
        Command::Help | Command::Quit => {
            println!("{}", cli::HELP);
            return Ok(false);
        }
    };

    match app.submit(event)? {
        Outcome::Unchanged => {
            if let Some(payload) = app.dragging() {
                println!("dragging {} ({})", payload.title, payload.status);
            } else {
                println!("nothing to change");
            }
            Ok(false)
        }
        Outcome::Pending | Outcome::Created(_) | Outcome::Updated(_) | Outcome::Deleted(_) => {
            Ok(changes_board)
        }
    }
}

/// Waits until the feed replaces the view, or `timeout` passes.
async fn settle(changes: &mut watch::Receiver<u64>, timeout: Duration) {
    if tokio::time::timeout(timeout, changes.changed()).await.is_err() {
        tracing::debug!(?timeout, "view did not change before timeout");
    }
}

/// Prints feed events and background command failures received so far.
fn drain(channels: &mut AppChannels) {
    while let Ok(event) = channels.events.try_recv() {
        match event {
            FeedEvent::Added(task) => {
                println!("  + {}  {}", cli::short_id(task.id), task.title);
            }
            FeedEvent::Updated { before, after } if before.status != after.status => {
                println!(
                    "  ~ {}  {}: {} -> {}",
                    cli::short_id(after.id),
                    after.title,
                    before.status,
                    after.status
                );
            }
            FeedEvent::Updated { before, after } => {
                println!(
                    "  ~ {}  \"{}\" -> \"{}\"",
                    cli::short_id(after.id),
                    before.title,
                    after.title
                );
            }
            FeedEvent::Removed(task) => {
                println!("  - {}  {}", cli::short_id(task.id), task.title);
            }
            FeedEvent::Reordered => {}
        }
    }
    while let Ok(err) = channels.errors.try_recv() {
        println!("error: {err}");
    }
}
