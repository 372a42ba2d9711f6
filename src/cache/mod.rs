//! Durable local cache of board snapshots.
//!
//! The cache is a last-known-state projection keyed by (board id, scope id)
//! and holds only the board's scalar fields. It serves reads when the
//! remote source is degraded, absent, or not configured, and can act as the
//! sole backing store in that mode. It is never authoritative: entries are
//! refreshed whenever a snapshot arrives and deleted only on explicit
//! remote deletion.
//!
//! Nested collections (columns, members) are deliberately not persisted;
//! boards read back from the cache carry empty lists. Full fidelity
//! requires the remote source. The cache keeps the app minimally usable
//! offline, not fully replicated.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use tracing::warn;

use crate::domain::{Board, Identifier, Team};

/// Async-safe handle to the board cache.
///
/// Wraps [`BoardCache`] behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, keeping synchronous SQLite
/// I/O off the async worker threads.
#[derive(Clone)]
pub struct CacheHandle {
    inner: Arc<Mutex<BoardCache>>,
}

impl CacheHandle {
    pub fn new(cache: BoardCache) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    /// Run a closure with access to the cache on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&BoardCache) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let cache = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = cache
                .lock()
                .map_err(|e| anyhow::anyhow!("Cache lock poisoned: {}", e))?;
            f(&guard)
        })
        .await
        .context("Cache task panicked")?
    }

    /// Upsert a batch of boards under a scope.
    pub async fn merge_boards(&self, boards: Vec<Board>, team_id: &Identifier<Team>) -> Result<()> {
        if boards.is_empty() {
            return Ok(());
        }
        let scope = team_id.as_str().to_string();
        self.call(move |cache| cache.merge(&boards, &scope)).await
    }

    /// Remove the board matching both id and scope.
    pub async fn delete_board(
        &self,
        board_id: &Identifier<Board>,
        team_id: &Identifier<Team>,
    ) -> Result<()> {
        let id = board_id.as_str().to_string();
        let scope = team_id.as_str().to_string();
        self.call(move |cache| cache.delete(&id, &scope)).await
    }

    /// Full projected board list for a scope; empty when the scope is
    /// unknown.
    pub async fn cached_boards(&self, team_id: &Identifier<Team>) -> Result<Vec<Board>> {
        let scope = team_id.as_str().to_string();
        self.call(move |cache| cache.read(&scope)).await
    }
}

/// The SQLite-backed store underneath [`CacheHandle`].
pub struct BoardCache {
    conn: Connection,
}

impl BoardCache {
    /// Open (or create) the cache database at the given path and run
    /// migrations.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open cache database")?;
        let cache = Self { conn };
        cache.init()?;
        Ok(cache)
    }

    /// Create an in-memory cache (for testing and ephemeral sessions).
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory cache database")?;
        let cache = Self { conn };
        cache.init()?;
        Ok(cache)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS cached_boards (
                    id TEXT NOT NULL,
                    scope_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    owner_id TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (id, scope_id)
                );

                CREATE INDEX IF NOT EXISTS idx_cached_boards_scope
                    ON cached_boards(scope_id);
                ",
            )
            .context("Failed to create cache tables")?;
        Ok(())
    }

    /// Upsert each board by (id, scope): overwrite all scalar fields of an
    /// existing row, insert otherwise. Merging an identical batch twice
    /// leaves the stored state unchanged.
    pub fn merge(&self, boards: &[Board], scope: &str) -> Result<()> {
        if boards.is_empty() {
            return Ok(());
        }
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin cache merge transaction")?;
        for board in boards {
            tx.execute(
                "INSERT INTO cached_boards (id, scope_id, name, description, owner_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id, scope_id) DO UPDATE SET
                     name = excluded.name,
                     description = excluded.description,
                     owner_id = excluded.owner_id,
                     created_at = excluded.created_at,
                     updated_at = excluded.updated_at",
                params![
                    board.id.as_str(),
                    scope,
                    board.name,
                    board.description,
                    board.owner_id.as_str(),
                    board.created_at.to_rfc3339(),
                    board.updated_at.to_rfc3339(),
                ],
            )
            .context("Failed to upsert cached board")?;
        }
        tx.commit().context("Failed to commit cache merge")?;
        Ok(())
    }

    /// Remove the row matching both id and scope. Scope participation in
    /// the key guards against id collisions across scopes.
    pub fn delete(&self, board_id: &str, scope: &str) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM cached_boards WHERE id = ?1 AND scope_id = ?2",
                params![board_id, scope],
            )
            .context("Failed to delete cached board")?;
        Ok(())
    }

    /// Full projected list for a scope. Unknown scopes return an empty
    /// list, never an error; rows that no longer parse are dropped.
    pub fn read(&self, scope: &str) -> Result<Vec<Board>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, description, owner_id, created_at, updated_at
                 FROM cached_boards WHERE scope_id = ?1
                 ORDER BY created_at, id",
            )
            .context("Failed to prepare cache read")?;
        let rows = stmt
            .query_map(params![scope], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .context("Failed to query cached boards")?;

        let mut boards = Vec::new();
        for row in rows {
            let (id, name, description, owner_id, created_at, updated_at) =
                row.context("Failed to read cached board row")?;
            let (Some(created_at), Some(updated_at)) =
                (parse_timestamp(&created_at), parse_timestamp(&updated_at))
            else {
                warn!(board = id.as_str(), "dropping cached board with malformed timestamps");
                continue;
            };
            boards.push(Board {
                id: Identifier::from_raw(id),
                name,
                description,
                owner_id: Identifier::from_raw(owner_id),
                // Nested collections are not cached.
                columns: Vec::new(),
                members: Vec::new(),
                created_at,
                updated_at,
            });
        }
        Ok(boards)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
