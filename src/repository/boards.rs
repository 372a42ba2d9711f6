//! Board repositories: the adapter-backed façade and the cache-only
//! fallback.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::warn;

use crate::cache::CacheHandle;
use crate::domain::{Board, Identifier, Team};
use crate::errors::RepositoryError;
use crate::registry::{ChannelRegistry, UpstreamGuard};
use crate::source::{BoardDataSource, SnapshotStream};

use super::BoardRepository;

/// Live board repository backed by a remote data source.
///
/// One upstream feed per team is shared by all subscribers via the
/// registry and torn down when the last subscriber leaves. Every arriving
/// snapshot, and every successful local mutation, also refreshes the
/// durable cache for that team, so offline reads stay close to the last
/// known state. Cache failures are logged and never fail the mutation.
pub struct SyncedBoardRepository<S> {
    source: Arc<S>,
    cache: CacheHandle,
    registry: ChannelRegistry<Board>,
}

impl<S: BoardDataSource + 'static> SyncedBoardRepository<S> {
    pub fn new(source: S, cache: CacheHandle) -> Self {
        Self {
            source: Arc::new(source),
            cache,
            registry: ChannelRegistry::new(),
        }
    }

    /// Start the upstream feed for one team and hand its guard to the
    /// registry. Must run inside a tokio runtime.
    fn connect_feed(&self, team_id: &Identifier<Team>) -> UpstreamGuard {
        let mut snapshots = self.source.board_snapshots(team_id);
        let registry = self.registry.clone();
        let cache = self.cache.clone();
        let team_id = team_id.clone();
        let task = tokio::spawn(async move {
            let scope = team_id.as_str().to_string();
            while let Some(event) = snapshots.next().await {
                match event {
                    Ok(boards) => {
                        if let Err(err) = cache.merge_boards(boards.clone(), &team_id).await {
                            warn!(scope = scope.as_str(), error = %err, "board cache merge failed");
                        }
                        registry.publish(&scope, boards);
                    }
                    Err(err) => {
                        registry.fail(&scope, err);
                        break;
                    }
                }
            }
        });
        UpstreamGuard::new(task.abort_handle())
    }

    async fn refresh_cache(&self, board: Board, team_id: &Identifier<Team>) {
        if let Err(err) = self.cache.merge_boards(vec![board], team_id).await {
            warn!(scope = team_id.as_str(), error = %err, "board cache merge failed");
        }
    }
}

#[async_trait]
impl<S: BoardDataSource + 'static> BoardRepository for SyncedBoardRepository<S> {
    fn observe_boards(&self, team_id: &Identifier<Team>) -> SnapshotStream<Board> {
        let subscription = self.registry.subscribe(team_id.as_str());
        self.registry
            .ensure_upstream(team_id.as_str(), || self.connect_feed(team_id));
        Box::pin(subscription)
    }

    async fn create_board(
        &self,
        board: Board,
        team_id: &Identifier<Team>,
    ) -> Result<(), RepositoryError> {
        self.source.create_board(&board, team_id).await?;
        self.refresh_cache(board, team_id).await;
        Ok(())
    }

    async fn update_board(
        &self,
        board: Board,
        team_id: &Identifier<Team>,
    ) -> Result<(), RepositoryError> {
        self.source.update_board(&board, team_id).await?;
        self.refresh_cache(board, team_id).await;
        Ok(())
    }

    async fn delete_board(
        &self,
        board_id: &Identifier<Board>,
        team_id: &Identifier<Team>,
    ) -> Result<(), RepositoryError> {
        self.source.delete_board(board_id, team_id).await?;
        if let Err(err) = self.cache.delete_board(board_id, team_id).await {
            warn!(scope = team_id.as_str(), error = %err, "board cache delete failed");
        }
        Ok(())
    }
}

/// Board repository for deployments with no remote backend wired.
///
/// Reads serve the cached projection and the sequence ends after that
/// single snapshot; every mutation reports `FeatureUnavailable`.
pub struct CacheOnlyBoardRepository {
    cache: CacheHandle,
}

impl CacheOnlyBoardRepository {
    pub fn new(cache: CacheHandle) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl BoardRepository for CacheOnlyBoardRepository {
    fn observe_boards(&self, team_id: &Identifier<Team>) -> SnapshotStream<Board> {
        let cache = self.cache.clone();
        let team_id = team_id.clone();
        Box::pin(futures_util::stream::once(async move {
            match cache.cached_boards(&team_id).await {
                Ok(boards) => Ok(boards),
                Err(err) => {
                    warn!(scope = team_id.as_str(), error = %err, "cached board read failed");
                    Ok(Vec::new())
                }
            }
        }))
    }

    async fn create_board(
        &self,
        _board: Board,
        _team_id: &Identifier<Team>,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::FeatureUnavailable)
    }

    async fn update_board(
        &self,
        _board: Board,
        _team_id: &Identifier<Team>,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::FeatureUnavailable)
    }

    async fn delete_board(
        &self,
        _board_id: &Identifier<Board>,
        _team_id: &Identifier<Team>,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::FeatureUnavailable)
    }
}
