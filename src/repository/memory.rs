//! In-memory backends for demo and offline deployments.
//!
//! These repositories keep the registry itself as the single store: every
//! mutation is a read-modify-write of the scope's snapshot inside the
//! registry's critical section, so concurrent mutations can never publish
//! out of order. No upstream guards are attached; there is nothing to
//! tear down when the last subscriber leaves.
//!
//! Tasks here carry no structured status on the wire, so create and move
//! derive it from the destination column via
//! [`crate::reconcile::status_for_column`].

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{
    Board, ChatChannel, ChatMessage, Identifier, Task, TaskColumn, Team,
};
use crate::errors::RepositoryError;
use crate::reconcile::status_for_column;
use crate::registry::ChannelRegistry;
use crate::source::SnapshotStream;

use super::{BoardRepository, ChatRepository, TaskRepository};

/// Team id every demo deployment observes.
pub const DEMO_TEAM: &str = "demo-team";

/// Channel id of the seeded demo conversation.
pub const DEMO_CHANNEL: &str = "general";

/// In-memory board store with live fan-out.
#[derive(Default)]
pub struct InMemoryBoardRepository {
    registry: ChannelRegistry<Board>,
}

impl InMemoryBoardRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one sample board under [`DEMO_TEAM`].
    pub fn with_demo_data() -> Self {
        let repo = Self::new();
        let board = Board {
            id: Identifier::from_raw("design-sprint"),
            name: "Design Sprint".to_string(),
            description: "Tasks for the client UI refresh.".to_string(),
            owner_id: Identifier::from_raw("owner"),
            columns: vec![
                TaskColumn::new(Identifier::from_raw("backlog"), "Backlog", 0),
                TaskColumn::new(Identifier::from_raw("in-progress"), "In Progress", 1),
                TaskColumn::new(Identifier::from_raw("review"), "Review", 2),
                TaskColumn::new(Identifier::from_raw("done"), "Done", 3),
            ],
            members: vec![
                Identifier::from_raw("owner"),
                Identifier::from_raw("designer"),
                Identifier::from_raw("developer"),
            ],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        repo.registry.publish(DEMO_TEAM, vec![board]);
        repo
    }
}

#[async_trait]
impl BoardRepository for InMemoryBoardRepository {
    fn observe_boards(&self, team_id: &Identifier<Team>) -> SnapshotStream<Board> {
        Box::pin(self.registry.subscribe(team_id.as_str()))
    }

    async fn create_board(
        &self,
        board: Board,
        team_id: &Identifier<Team>,
    ) -> Result<(), RepositoryError> {
        self.registry.update(team_id.as_str(), |boards| {
            boards.push(board);
            true
        });
        Ok(())
    }

    async fn update_board(
        &self,
        board: Board,
        team_id: &Identifier<Team>,
    ) -> Result<(), RepositoryError> {
        let replaced = self.registry.update(team_id.as_str(), |boards| {
            match boards.iter_mut().find(|b| b.id == board.id) {
                Some(slot) => {
                    *slot = board;
                    true
                }
                None => false,
            }
        });
        if replaced { Ok(()) } else { Err(RepositoryError::NotFound) }
    }

    async fn delete_board(
        &self,
        board_id: &Identifier<Board>,
        team_id: &Identifier<Team>,
    ) -> Result<(), RepositoryError> {
        let removed = self.registry.update(team_id.as_str(), |boards| {
            let before = boards.len();
            boards.retain(|b| b.id != *board_id);
            boards.len() != before
        });
        if removed { Ok(()) } else { Err(RepositoryError::NotFound) }
    }
}

/// In-memory task store with live fan-out and column-based status
/// derivation.
///
/// Move, update, and delete scan every board and patch all records
/// matching the task id. Ids are generated UUIDs, so a cross-board match
/// is normally exactly one record; when an id does repeat, all matches are
/// patched.
#[derive(Default)]
pub struct InMemoryTaskRepository {
    registry: ChannelRegistry<Task>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    fn observe_tasks(&self, board_id: &Identifier<Board>) -> SnapshotStream<Task> {
        Box::pin(self.registry.subscribe(board_id.as_str()))
    }

    async fn create_task(
        &self,
        task: Task,
        board_id: &Identifier<Board>,
        column_id: &Identifier<TaskColumn>,
    ) -> Result<(), RepositoryError> {
        self.registry.update(board_id.as_str(), |tasks| {
            let mut task = task;
            task.status = status_for_column(column_id, tasks);
            tasks.push(task);
            true
        });
        Ok(())
    }

    async fn move_task(
        &self,
        task_id: &Identifier<Task>,
        column_id: &Identifier<TaskColumn>,
        _order: i32,
    ) -> Result<(), RepositoryError> {
        // Ordering within a column lives on the board document and is the
        // adapter's concern; here a move only reconciles the status.
        let patched = self.registry.update_scopes(|_, tasks| {
            let Some(index) = tasks.iter().position(|t| t.id == *task_id) else {
                return false;
            };
            let status = status_for_column(column_id, tasks);
            let task = &mut tasks[index];
            task.status = status;
            task.updated_at = Utc::now();
            true
        });
        if patched > 0 { Ok(()) } else { Err(RepositoryError::NotFound) }
    }

    async fn update_task(&self, task: Task) -> Result<(), RepositoryError> {
        let patched = self.registry.update_scopes(|_, tasks| {
            match tasks.iter_mut().find(|t| t.id == task.id) {
                Some(slot) => {
                    *slot = task.clone();
                    true
                }
                None => false,
            }
        });
        if patched > 0 { Ok(()) } else { Err(RepositoryError::NotFound) }
    }

    async fn delete_task(&self, task_id: &Identifier<Task>) -> Result<(), RepositoryError> {
        let patched = self.registry.update_scopes(|_, tasks| {
            let before = tasks.len();
            tasks.retain(|t| t.id != *task_id);
            tasks.len() != before
        });
        if patched > 0 { Ok(()) } else { Err(RepositoryError::NotFound) }
    }
}

/// In-memory chat store with live fan-out, seeded with a welcome message.
#[derive(Default)]
pub struct InMemoryChatRepository {
    registry: ChannelRegistry<ChatMessage>,
}

impl InMemoryChatRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a system welcome message in [`DEMO_CHANNEL`].
    pub fn with_demo_data() -> Self {
        let repo = Self::new();
        let mut welcome = ChatMessage::new(
            Identifier::from_raw(DEMO_CHANNEL),
            Identifier::from_raw("owner"),
            "Welcome to TeamBoard! Discuss tasks and turn messages into action.",
        );
        welcome.id = Identifier::from_raw("welcome-message");
        welcome.created_at = Utc::now() - chrono::Duration::hours(1);
        welcome.is_system_message = true;
        repo.registry.publish(DEMO_CHANNEL, vec![welcome]);
        repo
    }
}

#[async_trait]
impl ChatRepository for InMemoryChatRepository {
    fn observe_messages(
        &self,
        channel_id: &Identifier<ChatChannel>,
    ) -> SnapshotStream<ChatMessage> {
        Box::pin(self.registry.subscribe(channel_id.as_str()))
    }

    async fn send_message(&self, message: ChatMessage) -> Result<(), RepositoryError> {
        let scope = message.channel_id.as_str().to_string();
        self.registry.update(&scope, |messages| {
            messages.push(message);
            messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            true
        });
        Ok(())
    }

    async fn create_channel(&self, channel: ChatChannel) -> Result<(), RepositoryError> {
        // Materialize the scope so future subscribers replay an empty list;
        // an existing channel's messages are left untouched.
        self.registry.update(channel.id.as_str(), |_| false);
        Ok(())
    }
}
