//! Line commands for the `taskify` binary and text rendering of the board.
//!
//! The binary reads one command per line from stdin. Task ids may be given
//! as any unique suffix of their full form; `show` prints the last
//! [`SHORT_ID_LEN`] hex digits of each id.

use taskify_model::{DragPayload, TaskAction, TaskId, TaskStatus, ValidationError};

use crate::board::{BoardView, Columns, can_drop, resolve};

/// Number of trailing id characters shown by `show`.
pub const SHORT_ID_LEN: usize = 8;

/// Help text printed by the `help` command.
pub const HELP: &str = "\
commands:
  add <title>                  create a task in todo
  rename <id> <title>          change a task's title
  move <id> <status>           set status (todo, inprocess, complete)
  drag <id>                    pick up a card
  drop <column>                release the card on a column
  delete <id>                  delete a task
  show                         print the board
  export                       print the board as JSON
  remote-delete <id>           delete as another client would
  remote-rename <id> <title>   rename as another client would
  help                         show this text
  quit                         exit";

/// Errors from parsing a command line or resolving an id.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    /// The line named no known command.
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),

    /// A required argument was missing.
    #[error("usage: {0}")]
    Usage(&'static str),

    /// The status argument did not parse.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// No task id ends with the given fragment.
    #[error("no task matches id {0}")]
    UnknownId(String),

    /// More than one task id ends with the given fragment.
    #[error("id {0} matches more than one task")]
    AmbiguousId(String),

    /// The card offers no action to the requested status.
    #[error("a {from} task has no action to move it to {to}")]
    NoAction {
        /// Current status of the task.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },
}

/// A parsed command line. Ids are kept as typed until resolved against a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `add <title>`
    Add(String),
    /// `rename <id> <title>`
    Rename {
        /// Id fragment.
        id: String,
        /// New title as typed.
        title: String,
    },
    /// `move <id> <status>`
    Move {
        /// Id fragment.
        id: String,
        /// Target status.
        status: TaskStatus,
    },
    /// `drag <id>`
    Drag(String),
    /// `drop <column>`
    Drop(TaskStatus),
    /// `delete <id>`
    Delete(String),
    /// `show`
    Show,
    /// `export`
    Export,
    /// `remote-delete <id>`
    RemoteDelete(String),
    /// `remote-rename <id> <title>`
    RemoteRename {
        /// Id fragment.
        id: String,
        /// New title as typed.
        title: String,
    },
    /// `help`
    Help,
    /// `quit`
    Quit,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
///
/// Titles keep their inner whitespace; validation is left to the board.
///
/// # Errors
///
/// Returns [`CommandError`] for unknown commands, missing arguments, or an
/// unknown status name.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim_start();

    let command = match name {
        "add" => Command::Add(rest.to_string()),
        "rename" => {
            let (id, title) = id_and_rest(rest, "rename <id> <title>")?;
            Command::Rename { id, title }
        }
        "move" => {
            let (id, status) = id_and_rest(rest, "move <id> <status>")?;
            Command::Move {
                id,
                status: status.parse()?,
            }
        }
        "drag" => Command::Drag(required(rest, "drag <id>")?),
        "drop" => Command::Drop(required(rest, "drop <column>")?.parse()?),
        "delete" => Command::Delete(required(rest, "delete <id>")?),
        "show" => Command::Show,
        "export" => Command::Export,
        "remote-delete" => Command::RemoteDelete(required(rest, "remote-delete <id>")?),
        "remote-rename" => {
            let (id, title) = id_and_rest(rest, "remote-rename <id> <title>")?;
            Command::RemoteRename { id, title }
        }
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn required(rest: &str, usage: &'static str) -> Result<String, CommandError> {
    let value = rest.trim();
    if value.is_empty() {
        return Err(CommandError::Usage(usage));
    }
    Ok(value.to_string())
}

/// Splits `<id> <rest>`. The remainder may be blank.
fn id_and_rest(rest: &str, usage: &'static str) -> Result<(String, String), CommandError> {
    let (id, tail) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    if id.is_empty() {
        return Err(CommandError::Usage(usage));
    }
    Ok((id.to_string(), tail.to_string()))
}

/// Finds the task whose id ends with `fragment` (case-insensitive).
///
/// # Errors
///
/// Returns [`CommandError::UnknownId`] if nothing matches and
/// [`CommandError::AmbiguousId`] if several tasks do.
pub fn resolve_id(view: &BoardView, fragment: &str) -> Result<TaskId, CommandError> {
    let needle = fragment.to_ascii_lowercase();
    let mut matches = view
        .iter()
        .map(|task| task.id)
        .filter(|id| id.to_string().ends_with(&needle));
    match (matches.next(), matches.next()) {
        (Some(id), None) => Ok(id),
        (None, _) => Err(CommandError::UnknownId(fragment.to_string())),
        (Some(_), Some(_)) => Err(CommandError::AmbiguousId(fragment.to_string())),
    }
}

/// Picks the card action that moves `id` to `target`.
///
/// Only the buttons a card shows for its current status are accepted, so a
/// `move` never goes backwards or leaves `complete`.
///
/// # Errors
///
/// Returns [`CommandError::UnknownId`] if the task is not in the view and
/// [`CommandError::NoAction`] if no offered action reaches `target`.
pub fn action_for(
    view: &BoardView,
    id: TaskId,
    target: TaskStatus,
) -> Result<TaskAction, CommandError> {
    let task = view
        .get(id)
        .ok_or_else(|| CommandError::UnknownId(id.to_string()))?;
    TaskAction::available_for(task.status)
        .iter()
        .copied()
        .find(|action| action.target() == target)
        .ok_or(CommandError::NoAction {
            from: task.status,
            to: target,
        })
}

/// Returns `true` if dropping `payload` on `target` changes the card's status
/// in `view`. A drop that snaps back still issues a command, but the board it
/// produces is identical.
#[must_use]
pub fn drop_moves_card(view: &BoardView, payload: &DragPayload, target: TaskStatus) -> bool {
    let current = view.get(payload.id).map_or(payload.status, |task| task.status);
    can_drop(payload, target) && resolve(current, target).is_some_and(|next| next != current)
}

/// The trailing characters of `id` shown to the user.
#[must_use]
pub fn short_id(id: TaskId) -> String {
    let full = id.to_string();
    full[full.len().saturating_sub(SHORT_ID_LEN)..].to_string()
}

/// Renders the board as text, one section per column.
#[must_use]
pub fn render(columns: &Columns, timestamp_format: &str) -> String {
    let mut out = String::new();
    for (status, tasks) in columns.iter() {
        out.push_str(&format!("== {} ({}) ==\n", status.label(), tasks.len()));
        for task in tasks {
            out.push_str(&format!(
                "  {}  {}  [{}]\n",
                short_id(task.id),
                task.title,
                format_timestamp_ms(task.created_at, timestamp_format)
            ));
        }
    }
    out
}

/// Formats an epoch-millisecond timestamp in local time.
#[must_use]
pub fn format_timestamp_ms(ms: u64, format: &str) -> String {
    use chrono::{Local, TimeZone};
    let secs = i64::try_from(ms / 1000).unwrap_or(i64::MAX);
    let nsecs = u32::try_from((ms % 1000) * 1_000_000).unwrap_or(0);
    match Local.timestamp_opt(secs, nsecs) {
        chrono::LocalResult::Single(dt) => dt.format(format).to_string(),
        _ => "?".to_string(),
    }
}
