//! SQLite sync-state store
//!
//! One row per tie-point in the `sync_states` table. A flush replaces the
//! table contents inside a single transaction.
//!
//! The schema version lives in `PRAGMA user_version`: a fresh database is
//! created at [`SCHEMA_VERSION`], and a database stamped with any other
//! version is refused rather than rewritten.
//!
//! ## Type Mapping
//!
//! | Domain Type    | SQL Type | Strategy                                             |
//! |----------------|----------|------------------------------------------------------|
//! | VaultPath      | TEXT     | `.as_str()` / `VaultPath::new()`                     |
//! | RemoteId       | TEXT     | `.as_str()` / `RemoteId::new()`                      |
//! | DateTime<Utc>  | TEXT     | RFC 3339 via `to_rfc3339()` / `parse_from_rfc3339()` |
//! | epoch millis   | INTEGER  | stored as-is                                         |

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, instrument};

use vaultsync_core::domain::{RemoteId, SyncState, SyncStateMap, VaultPath};
use vaultsync_core::ports::ISyncStateStore;

use crate::CacheError;

/// Version stamped into `PRAGMA user_version` by this build
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA: &str = include_str!("migrations/20260301_sync_states.sql");

/// [`ISyncStateStore`] backed by SQLite
pub struct SqliteSyncStateStore {
    pool: SqlitePool,
}

impl SqliteSyncStateStore {
    /// Opens the state database at `path`, creating the file, its parent
    /// directories and the `sync_states` table as needed
    ///
    /// # Errors
    ///
    /// `ConnectionFailed` if the file cannot be opened, `MigrationFailed` if
    /// the table cannot be created, `UnsupportedVersion` if the database was
    /// written by a build with a different schema.
    pub async fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        // one writer per run; a second connection serves `status` reads
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await
            .map_err(|e| {
                CacheError::ConnectionFailed(format!("{}: {e}", path.display()))
            })?;

        let store = Self { pool };
        store.prepare_schema().await?;
        info!(path = %path.display(), "Sync-state database opened");
        Ok(store)
    }

    /// Opens a private in-memory database
    ///
    /// Limited to a single connection: every SQLite connection to
    /// `:memory:` sees its own database.
    pub async fn open_in_memory() -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| CacheError::ConnectionFailed(format!("in-memory database: {e}")))?;

        let store = Self { pool };
        store.prepare_schema().await?;
        Ok(store)
    }

    async fn prepare_schema(&self) -> Result<(), CacheError> {
        let found: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?;

        if found == 0 {
            let stamp = format!("PRAGMA user_version = {SCHEMA_VERSION}");
            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(SCHEMA)
                .execute(&mut *tx)
                .await
                .map_err(|e| CacheError::MigrationFailed(format!("sync_states: {e}")))?;
            sqlx::raw_sql(&stamp).execute(&mut *tx).await?;
            tx.commit().await?;
            debug!(version = SCHEMA_VERSION, "sync_states schema created");
            return Ok(());
        }

        if found != i64::from(SCHEMA_VERSION) {
            return Err(CacheError::UnsupportedVersion {
                found: u32::try_from(found).unwrap_or(u32::MAX),
                expected: SCHEMA_VERSION,
            });
        }
        Ok(())
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CacheError::SerializationError(format!("Invalid timestamp '{}': {}", s, e)))
}

fn row_to_state(row: &SqliteRow) -> Result<(VaultPath, SyncState), CacheError> {
    let path: String = row.try_get("path")?;
    let remote_id: String = row.try_get("remote_id")?;
    let remote_mtime: Option<String> = row.try_get("remote_mtime")?;
    let remote_content_hash: Option<String> = row.try_get("remote_content_hash")?;
    let local_mtime_epoch: Option<i64> = row.try_get("local_mtime_epoch")?;

    let path = VaultPath::new(path).map_err(|e| CacheError::SerializationError(e.to_string()))?;
    let remote_id =
        RemoteId::new(remote_id).map_err(|e| CacheError::SerializationError(e.to_string()))?;
    let remote_mtime = remote_mtime.as_deref().map(parse_timestamp).transpose()?;

    Ok((
        path,
        SyncState {
            remote_id,
            remote_mtime,
            remote_content_hash,
            local_mtime_epoch,
        },
    ))
}

#[async_trait::async_trait]
impl ISyncStateStore for SqliteSyncStateStore {
    #[instrument(skip(self))]
    async fn load(&self) -> anyhow::Result<SyncStateMap> {
        let rows = sqlx::query(
            "SELECT path, remote_id, remote_mtime, remote_content_hash, local_mtime_epoch \
             FROM sync_states ORDER BY path",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(CacheError::from)?;

        let states = rows
            .iter()
            .map(row_to_state)
            .collect::<Result<SyncStateMap, CacheError>>()?;
        debug!(entries = states.len(), "sync state loaded");
        Ok(states)
    }

    #[instrument(skip(self, states), fields(entries = states.len()))]
    async fn flush(&self, states: &SyncStateMap) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await.map_err(CacheError::from)?;

        sqlx::query("DELETE FROM sync_states")
            .execute(&mut *tx)
            .await
            .map_err(CacheError::from)?;

        for (path, state) in states {
            sqlx::query(
                "INSERT INTO sync_states \
                 (path, remote_id, remote_mtime, remote_content_hash, local_mtime_epoch) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(path.as_str())
            .bind(state.remote_id.as_str())
            .bind(state.remote_mtime.map(|dt| dt.to_rfc3339()))
            .bind(state.remote_content_hash.as_deref())
            .bind(state.local_mtime_epoch)
            .execute(&mut *tx)
            .await
            .map_err(CacheError::from)?;
        }

        tx.commit().await.map_err(CacheError::from)?;
        debug!("sync state flushed");
        Ok(())
    }
}
