//! Task records and their attachments and comments.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identifier::Identifier;
use super::member::TeamMember;

/// Workflow state of a task. Wire values are camelCase, matching the
/// backend document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    Backlog,
    Todo,
    InProgress,
    Review,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Todo => "todo",
            Self::InProgress => "inProgress",
            Self::Review => "review",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backlog" => Ok(Self::Backlog),
            "todo" => Ok(Self::Todo),
            "inProgress" => Ok(Self::InProgress),
            "review" => Ok(Self::Review),
            "done" => Ok(Self::Done),
            _ => Err(format!("Invalid task status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Invalid task priority: {}", s)),
        }
    }
}

/// A single task on a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Identifier<Task>,
    pub title: String,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<Identifier<TeamMember>>,
    pub creator_id: Identifier<TeamMember>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(default)]
    pub attachments: Vec<TaskAttachment>,
    #[serde(default)]
    pub comments: Vec<TaskComment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// New task with a generated id, current timestamps, and no
    /// attachments or comments.
    pub fn new(
        title: impl Into<String>,
        detail: impl Into<String>,
        creator_id: Identifier<TeamMember>,
        status: TaskStatus,
        priority: TaskPriority,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Identifier::new(),
            title: title.into(),
            detail: detail.into(),
            assignee_id: None,
            creator_id,
            due_date: None,
            status,
            priority,
            attachments: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A file attached to a task or chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAttachment {
    pub id: Identifier<TaskAttachment>,
    pub file_name: String,
    #[serde(rename = "fileURL")]
    pub file_url: String,
    pub uploaded_by: Identifier<TeamMember>,
    pub uploaded_at: DateTime<Utc>,
}

/// A comment left on a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskComment {
    pub id: Identifier<TaskComment>,
    pub author_id: Identifier<TeamMember>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
