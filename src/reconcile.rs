//! Reconciliation rules for denormalized task fields.
//!
//! Some backends carry no structured status on the wire; a task's status is
//! then derived from the column it lands in. The derivation is a fixed,
//! deterministic heuristic so that every device reconciles a move to the
//! same status.

use crate::domain::{Identifier, Task, TaskColumn, TaskStatus};

/// Substring needles checked against the column id, first match wins.
const COLUMN_NEEDLES: [(&str, TaskStatus); 5] = [
    ("backlog", TaskStatus::Backlog),
    ("review", TaskStatus::Review),
    ("done", TaskStatus::Done),
    ("progress", TaskStatus::InProgress),
    ("todo", TaskStatus::Todo),
];

/// Derive a task's status from its destination column.
///
/// The column id is matched case-insensitively against the needle list in
/// precedence order; a column id containing both `review` and `done`
/// resolves to `Review`. When nothing matches, the status of the most
/// recently added task on the board is reused, or `Todo` on an empty
/// board.
pub fn status_for_column(column_id: &Identifier<TaskColumn>, existing: &[Task]) -> TaskStatus {
    let lowercase_id = column_id.as_str().to_lowercase();
    for (needle, status) in COLUMN_NEEDLES {
        if lowercase_id.contains(needle) {
            return status;
        }
    }
    existing.last().map_or(TaskStatus::Todo, |task| task.status)
}
