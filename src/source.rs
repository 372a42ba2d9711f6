//! Remote data source adapter contracts.
//!
//! An adapter wraps one concrete backend (a realtime document store, a
//! gateway, a test double) and exposes two things per collection: a
//! push-based snapshot feed and request/response mutations. Feeds carry
//! full-snapshot semantics: an initial full batch, then a full batch on
//! every remote-side mutation, never deltas. A whole-connection failure
//! must end the feed with [`RepositoryError::Transport`]; per-record decode
//! failures are dropped from the batch by the adapter (see
//! [`crate::mapper::decode_batch`]).
//!
//! Adapters own their own timeout policy; the sync core imposes none and
//! expects failures to surface through the feed rather than stall
//! silently.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::domain::{
    Board, ChatChannel, ChatMessage, Identifier, Task, TaskColumn, Team,
};
use crate::errors::RepositoryError;
use crate::registry::SnapshotEvent;

/// A live feed of full snapshots for one scope.
pub type SnapshotStream<T> = BoxStream<'static, SnapshotEvent<T>>;

/// Backend access for board collections, scoped by team.
#[async_trait]
pub trait BoardDataSource: Send + Sync {
    /// Full board snapshots for a team: one initial batch, then one per
    /// remote-side mutation.
    fn board_snapshots(&self, team_id: &Identifier<Team>) -> SnapshotStream<Board>;

    async fn create_board(
        &self,
        board: &Board,
        team_id: &Identifier<Team>,
    ) -> Result<(), RepositoryError>;

    async fn update_board(
        &self,
        board: &Board,
        team_id: &Identifier<Team>,
    ) -> Result<(), RepositoryError>;

    async fn delete_board(
        &self,
        board_id: &Identifier<Board>,
        team_id: &Identifier<Team>,
    ) -> Result<(), RepositoryError>;
}

/// Backend access for task collections, scoped by board.
///
/// `move_task`, `update_task`, and `delete_task` carry no board scope: the
/// backend locates and patches every record matching the task id across
/// scopes. Task ids are generated UUIDs, so a cross-board collision is
/// accidental; when one exists, all matches are patched.
#[async_trait]
pub trait TaskDataSource: Send + Sync {
    fn task_snapshots(&self, board_id: &Identifier<Board>) -> SnapshotStream<Task>;

    async fn create_task(
        &self,
        task: &Task,
        board_id: &Identifier<Board>,
        column_id: &Identifier<TaskColumn>,
    ) -> Result<(), RepositoryError>;

    async fn move_task(
        &self,
        task_id: &Identifier<Task>,
        column_id: &Identifier<TaskColumn>,
        order: i32,
    ) -> Result<(), RepositoryError>;

    async fn update_task(&self, task: &Task) -> Result<(), RepositoryError>;

    async fn delete_task(&self, task_id: &Identifier<Task>) -> Result<(), RepositoryError>;
}

/// Backend access for chat channels and their message collections.
#[async_trait]
pub trait ChatDataSource: Send + Sync {
    fn message_snapshots(&self, channel_id: &Identifier<ChatChannel>) -> SnapshotStream<ChatMessage>;

    async fn send_message(&self, message: &ChatMessage) -> Result<(), RepositoryError>;

    async fn create_channel(&self, channel: &ChatChannel) -> Result<(), RepositoryError>;
}
