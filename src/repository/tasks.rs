//! Task repository backed by a remote data source.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Board, Identifier, Task, TaskColumn};
use crate::errors::RepositoryError;
use crate::registry::ChannelRegistry;
use crate::source::{SnapshotStream, TaskDataSource};

use super::{TaskRepository, relay_feed};

/// Live task repository. One upstream feed per board is shared by all
/// subscribers via the registry; mutations go straight to the adapter,
/// whose next pushed snapshot carries the result back to every observer.
pub struct SyncedTaskRepository<S> {
    source: Arc<S>,
    registry: ChannelRegistry<Task>,
}

impl<S: TaskDataSource + 'static> SyncedTaskRepository<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
            registry: ChannelRegistry::new(),
        }
    }
}

#[async_trait]
impl<S: TaskDataSource + 'static> TaskRepository for SyncedTaskRepository<S> {
    fn observe_tasks(&self, board_id: &Identifier<Board>) -> SnapshotStream<Task> {
        let subscription = self.registry.subscribe(board_id.as_str());
        self.registry.ensure_upstream(board_id.as_str(), || {
            relay_feed(
                &self.registry,
                board_id.as_str(),
                self.source.task_snapshots(board_id),
            )
        });
        Box::pin(subscription)
    }

    async fn create_task(
        &self,
        task: Task,
        board_id: &Identifier<Board>,
        column_id: &Identifier<TaskColumn>,
    ) -> Result<(), RepositoryError> {
        self.source.create_task(&task, board_id, column_id).await
    }

    async fn move_task(
        &self,
        task_id: &Identifier<Task>,
        column_id: &Identifier<TaskColumn>,
        order: i32,
    ) -> Result<(), RepositoryError> {
        self.source.move_task(task_id, column_id, order).await
    }

    async fn update_task(&self, task: Task) -> Result<(), RepositoryError> {
        self.source.update_task(&task).await
    }

    async fn delete_task(&self, task_id: &Identifier<Task>) -> Result<(), RepositoryError> {
        self.source.delete_task(task_id).await
    }
}
