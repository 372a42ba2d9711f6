//! Board aggregate: the board record, its columns, and the owning team.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identifier::Identifier;
use super::member::TeamMember;
use super::task::Task;

/// A kanban board owned by a team.
///
/// `columns` is conceptually ordered by [`TaskColumn::order`]; the list is
/// stored as received and not re-sorted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: Identifier<Board>,
    pub name: String,
    pub description: String,
    pub owner_id: Identifier<TeamMember>,
    pub columns: Vec<TaskColumn>,
    pub members: Vec<Identifier<TeamMember>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Board {
    /// New board with a generated id and current timestamps.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        owner_id: Identifier<TeamMember>,
        columns: Vec<TaskColumn>,
        members: Vec<Identifier<TeamMember>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Identifier::new(),
            name: name.into(),
            description: description.into(),
            owner_id,
            columns,
            members,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One column of a board, holding an ordered set of task ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskColumn {
    pub id: Identifier<TaskColumn>,
    pub title: String,
    pub order: i32,
    #[serde(default)]
    pub task_ids: Vec<Identifier<Task>>,
}

impl TaskColumn {
    pub fn new(id: Identifier<TaskColumn>, title: impl Into<String>, order: i32) -> Self {
        Self {
            id,
            title: title.into(),
            order,
            task_ids: Vec::new(),
        }
    }
}

/// The team a board collection is scoped under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: Identifier<Team>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    pub members: Vec<TeamMember>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_serializes_with_camel_case_fields() {
        let board = Board::new(
            "Design Sprint",
            "UI refresh tasks",
            Identifier::from_raw("owner"),
            vec![TaskColumn::new(Identifier::from_raw("backlog"), "Backlog", 0)],
            vec![Identifier::from_raw("owner")],
        );
        let json = serde_json::to_value(&board).unwrap();
        assert!(json.get("ownerId").is_some());
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["columns"][0]["taskIds"], serde_json::json!([]));
    }

    #[test]
    fn board_roundtrips_through_json() {
        let board = Board::new(
            "Sprint",
            "",
            Identifier::from_raw("owner"),
            vec![
                TaskColumn::new(Identifier::from_raw("todo"), "To Do", 0),
                TaskColumn::new(Identifier::from_raw("done"), "Done", 1),
            ],
            vec![],
        );
        let json = serde_json::to_string(&board).unwrap();
        let back: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(back, board);
    }
}
