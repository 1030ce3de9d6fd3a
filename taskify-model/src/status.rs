//! Task status enumeration and the explicit actions each status offers.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::task::ValidationError;

/// Status of a task on the board.
///
/// The board only ever moves forward: `Todo` is the initial state and
/// `Complete` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Task has been created but work has not started.
    Todo,
    /// Task is being worked on.
    InProcess,
    /// Task is done.
    Complete,
}

impl TaskStatus {
    /// All statuses in column order.
    pub const ALL: [Self; 3] = [Self::Todo, Self::InProcess, Self::Complete];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProcess => "inprocess",
            Self::Complete => "complete",
        }
    }

    /// Returns the column header shown for this status.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Todo => "Todo",
            Self::InProcess => "In Process",
            Self::Complete => "Complete",
        }
    }

    /// Returns `true` for the terminal status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "todo" => Ok(Self::Todo),
            "inprocess" | "in_process" | "in-process" => Ok(Self::InProcess),
            "complete" => Ok(Self::Complete),
            _ => Err(ValidationError::UnknownStatus(value.to_owned())),
        }
    }
}

/// Explicit (non-drag) actions a task card offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskAction {
    /// "Move to In Process".
    MoveToInProcess,
    /// "Move to Complete".
    MoveToComplete,
}

impl TaskAction {
    /// Returns the move buttons shown for a task in `status`.
    ///
    /// Renderers use this to decide which buttons to draw; the mutation
    /// gateway itself accepts any move.
    #[must_use]
    pub const fn available_for(status: TaskStatus) -> &'static [Self] {
        match status {
            TaskStatus::Todo => &[Self::MoveToInProcess, Self::MoveToComplete],
            TaskStatus::InProcess => &[Self::MoveToComplete],
            TaskStatus::Complete => &[],
        }
    }

    /// Returns the status this action moves a task to.
    #[must_use]
    pub const fn target(self) -> TaskStatus {
        match self {
            Self::MoveToInProcess => TaskStatus::InProcess,
            Self::MoveToComplete => TaskStatus::Complete,
        }
    }
}
