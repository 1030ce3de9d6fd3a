//! Column projection of the board view.

use taskify_model::{Task, TaskStatus};

use super::view::BoardView;

/// The three rendered columns, each in view order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Columns {
    /// Tasks with status `todo`.
    pub todo: Vec<Task>,
    /// Tasks with status `inprocess`.
    pub inprocess: Vec<Task>,
    /// Tasks with status `complete`.
    pub complete: Vec<Task>,
}

impl Columns {
    /// Returns the column for `status`.
    #[must_use]
    pub fn column(&self, status: TaskStatus) -> &[Task] {
        match status {
            TaskStatus::Todo => &self.todo,
            TaskStatus::InProcess => &self.inprocess,
            TaskStatus::Complete => &self.complete,
        }
    }

    /// Total number of tasks across all columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.todo.len() + self.inprocess.len() + self.complete.len()
    }

    /// Returns `true` if every column is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates `(status, tasks)` pairs in board order.
    pub fn iter(&self) -> impl Iterator<Item = (TaskStatus, &[Task])> {
        TaskStatus::ALL
            .into_iter()
            .map(move |status| (status, self.column(status)))
    }
}

/// Partitions the view by status, preserving order within each column.
#[must_use]
pub fn project(view: &BoardView) -> Columns {
    let mut columns = Columns::default();
    for task in view {
        let column = match task.status {
            TaskStatus::Todo => &mut columns.todo,
            TaskStatus::InProcess => &mut columns.inprocess,
            TaskStatus::Complete => &mut columns.complete,
        };
        column.push(task.clone());
    }
    columns
}
