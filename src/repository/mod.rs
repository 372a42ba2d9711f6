//! Repository façade: the public contract of the sync layer.
//!
//! ## Overview
//!
//! Four capability groups (boards, tasks, chat, users) each expose a live
//! `observe_*` subscription plus request/response mutations. Observation
//! goes through the [`crate::registry`], which replays the latest snapshot
//! immediately and forwards every later publish; mutations go to the
//! backing data source, and successful board mutations also refresh the
//! local cache for that scope.
//!
//! ## Module Map
//!
//! | Module   | Responsibility                                              |
//! |----------|-------------------------------------------------------------|
//! | `boards` | `SyncedBoardRepository` (adapter + cache + registry) and `CacheOnlyBoardRepository` |
//! | `tasks`  | `SyncedTaskRepository` (adapter + registry)                 |
//! | `chat`   | `SyncedChatRepository` (adapter + registry)                 |
//! | `memory` | In-memory demo backends with seed data and status inference |
//! | `users`  | `GuestUserRepository` demo sign-in                          |
//!
//! Every `observe_*` stream is non-terminating and ends only when the
//! scope's upstream fails with an unrecoverable transport error. Callers
//! own retry policy; this layer reports each failure exactly once.

pub mod boards;
pub mod chat;
pub mod memory;
pub mod tasks;
pub mod users;

use async_trait::async_trait;
use futures_util::StreamExt;

use crate::domain::{
    Board, ChatChannel, ChatMessage, Identifier, Task, TaskColumn, Team, TeamMember,
};
use crate::errors::RepositoryError;
use crate::registry::{ChannelRegistry, UpstreamGuard};
use crate::source::SnapshotStream;

pub use boards::{CacheOnlyBoardRepository, SyncedBoardRepository};
pub use chat::SyncedChatRepository;
pub use memory::{InMemoryBoardRepository, InMemoryChatRepository, InMemoryTaskRepository};
pub use tasks::SyncedTaskRepository;
pub use users::GuestUserRepository;

/// Forward an adapter feed into the registry until it ends.
///
/// Snapshots are published as-is; the first error fails the scope's
/// subscribers and stops the relay. The returned guard aborts the relay
/// task when dropped. Must be called inside a tokio runtime.
pub(crate) fn relay_feed<T>(
    registry: &ChannelRegistry<T>,
    scope: &str,
    mut feed: SnapshotStream<T>,
) -> UpstreamGuard
where
    T: Clone + Send + 'static,
{
    let registry = registry.clone();
    let scope = scope.to_string();
    let task = tokio::spawn(async move {
        while let Some(event) = feed.next().await {
            match event {
                Ok(snapshot) => registry.publish(&scope, snapshot),
                Err(err) => {
                    registry.fail(&scope, err);
                    break;
                }
            }
        }
    });
    UpstreamGuard::new(task.abort_handle())
}

/// Board collection contract, scoped by team.
#[async_trait]
pub trait BoardRepository: Send + Sync {
    /// Live full-snapshot feed of the team's boards. The latest known
    /// snapshot is delivered immediately on subscribe.
    fn observe_boards(&self, team_id: &Identifier<Team>) -> SnapshotStream<Board>;

    async fn create_board(
        &self,
        board: Board,
        team_id: &Identifier<Team>,
    ) -> Result<(), RepositoryError>;

    async fn update_board(
        &self,
        board: Board,
        team_id: &Identifier<Team>,
    ) -> Result<(), RepositoryError>;

    async fn delete_board(
        &self,
        board_id: &Identifier<Board>,
        team_id: &Identifier<Team>,
    ) -> Result<(), RepositoryError>;
}

/// Task collection contract, scoped by board for observation and creation.
///
/// Move, update, and delete take only the task id and patch every record
/// matching it across boards (see [`crate::source::TaskDataSource`]).
#[async_trait]
pub trait TaskRepository: Send + Sync {
    fn observe_tasks(&self, board_id: &Identifier<Board>) -> SnapshotStream<Task>;

    async fn create_task(
        &self,
        task: Task,
        board_id: &Identifier<Board>,
        column_id: &Identifier<TaskColumn>,
    ) -> Result<(), RepositoryError>;

    async fn move_task(
        &self,
        task_id: &Identifier<Task>,
        column_id: &Identifier<TaskColumn>,
        order: i32,
    ) -> Result<(), RepositoryError>;

    async fn update_task(&self, task: Task) -> Result<(), RepositoryError>;

    async fn delete_task(&self, task_id: &Identifier<Task>) -> Result<(), RepositoryError>;
}

/// Chat contract: channel creation plus per-channel message feeds.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    fn observe_messages(&self, channel_id: &Identifier<ChatChannel>)
    -> SnapshotStream<ChatMessage>;

    async fn send_message(&self, message: ChatMessage) -> Result<(), RepositoryError>;

    async fn create_channel(&self, channel: ChatChannel) -> Result<(), RepositoryError>;
}

/// Authentication and member-list contract. Consumed by the sync layer;
/// concrete backends live with the embedding application.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn current_user(&self) -> Result<Option<TeamMember>, RepositoryError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<TeamMember, RepositoryError>;

    async fn sign_out(&self) -> Result<(), RepositoryError>;

    fn observe_team_members(&self, team_id: &Identifier<Team>) -> SnapshotStream<TeamMember>;
}

/// Push-notification registration contract. Consumed, never implemented
/// here; the sync core does not touch device tokens itself.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn register_for_push(&self) -> Result<(), RepositoryError>;

    async fn update_device_token(&self, token: &[u8]) -> Result<(), RepositoryError>;
}
