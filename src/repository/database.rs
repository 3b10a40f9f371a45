use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, QueryBuilder, Row, Sqlite};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::model::{
    EntryRecord, HistoryPoint, ScanErrorKind, ScanErrorRecord, ScanTotals, Snapshot, SnapshotStatus,
    StoredEntry,
};

use super::growth::DirectorySize;
use super::SCHEMA_VERSION;

const SNAPSHOT_COLUMNS: &str =
    "id, mount_point, started_at, completed_at, total_size, total_files, total_dirs, status";

const ENTRY_COLUMNS: &str =
    "snapshot_id, path, name, size, file_count, dir_count, depth, parent_path, is_dir, error";

const SECONDS_PER_DAY: i64 = 86_400;

/// Metadata key holding the schema version the tables were built with
pub const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Database abstraction for SQLite operations
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection
    pub async fn new(db_path: &str) -> Result<Self> {
        let in_memory = db_path == ":memory:";
        if !in_memory {
            if let Some(parent) = Path::new(db_path).parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Could not create {}", parent.display()))?;
            }
        }

        // Configure connection options with PRAGMAs applied to every connection
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", db_path))?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            .pragma("temp_store", "MEMORY")
            .pragma("cache_size", "-64000"); // 64MB cache

        // Every connection to :memory: is its own database, so keep exactly one alive
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        Ok(Self { pool })
    }

    /// Initialize database schema, returns true if schema was rebuilt
    pub async fn init_schema(&self) -> Result<bool> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )"
        ).execute(&self.pool).await?;

        let stored_version = self.get_metadata(SCHEMA_VERSION_KEY).await?;

        let needs_rebuild = stored_version.as_deref() != Some(SCHEMA_VERSION);

        if needs_rebuild {
            if let Some(old) = &stored_version {
                info!(from = %old, to = SCHEMA_VERSION, "schema version changed, rebuilding database");
            }
            sqlx::query("DROP TABLE IF EXISTS scan_errors").execute(&self.pool).await?;
            sqlx::query("DROP TABLE IF EXISTS entries").execute(&self.pool).await?;
            sqlx::query("DROP TABLE IF EXISTS snapshots").execute(&self.pool).await?;
            sqlx::query("DELETE FROM metadata").execute(&self.pool).await?;
        }

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                mount_point TEXT NOT NULL,
                started_at INTEGER NOT NULL,
                completed_at INTEGER,
                total_size INTEGER NOT NULL DEFAULT 0,
                total_files INTEGER NOT NULL DEFAULT 0,
                total_dirs INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'running'
            )"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                snapshot_id INTEGER NOT NULL REFERENCES snapshots(id) ON DELETE CASCADE,
                path TEXT NOT NULL,
                name TEXT NOT NULL,
                size INTEGER NOT NULL DEFAULT 0,
                file_count INTEGER NOT NULL DEFAULT 0,
                dir_count INTEGER NOT NULL DEFAULT 0,
                depth INTEGER NOT NULL DEFAULT 0,
                parent_path TEXT,
                is_dir INTEGER NOT NULL DEFAULT 1,
                error TEXT
            )"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS scan_errors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                snapshot_id INTEGER NOT NULL REFERENCES snapshots(id) ON DELETE CASCADE,
                path TEXT NOT NULL,
                error_type TEXT NOT NULL,
                error_message TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            )"
        ).execute(&self.pool).await?;

        for index in [
            "CREATE INDEX IF NOT EXISTS idx_entries_snapshot ON entries(snapshot_id)",
            "CREATE INDEX IF NOT EXISTS idx_entries_path ON entries(path)",
            "CREATE INDEX IF NOT EXISTS idx_entries_parent ON entries(snapshot_id, parent_path)",
            "CREATE INDEX IF NOT EXISTS idx_entries_depth ON entries(snapshot_id, depth)",
            "CREATE INDEX IF NOT EXISTS idx_errors_snapshot ON scan_errors(snapshot_id)",
            "CREATE INDEX IF NOT EXISTS idx_snapshots_mount ON snapshots(mount_point)",
            "CREATE INDEX IF NOT EXISTS idx_snapshots_time ON snapshots(completed_at)",
        ] {
            sqlx::query(index).execute(&self.pool).await?;
        }

        if needs_rebuild {
            self.set_metadata(SCHEMA_VERSION_KEY, SCHEMA_VERSION).await?;
        }

        Ok(needs_rebuild)
    }

    /// Get metadata value by key
    pub async fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        Ok(sqlx::query("SELECT value FROM metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.get("value")))
    }

    /// Set metadata value
    pub async fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Snapshot lifecycle
    // ------------------------------------------------------------------

    /// Create a running snapshot and return its id
    pub async fn create_snapshot(&self, mount_point: &str, started_at: i64) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO snapshots (mount_point, started_at, status) VALUES (?, ?, 'running')"
        )
        .bind(mount_point)
        .bind(started_at)
        .execute(&self.pool)
        .await
        .context("Failed to create snapshot")?;
        Ok(result.last_insert_rowid())
    }

    /// Mark a running snapshot completed. Returns false if it was no longer running.
    pub async fn complete_snapshot(&self, snapshot_id: i64, totals: ScanTotals, completed_at: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE snapshots
             SET completed_at = ?, total_size = ?, total_files = ?, total_dirs = ?, status = 'completed'
             WHERE id = ? AND status = 'running'"
        )
        .bind(completed_at)
        .bind(totals.size as i64)
        .bind(totals.files as i64)
        .bind(totals.dirs as i64)
        .bind(snapshot_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Mark a running snapshot failed and log the reason as a fatal error at `/`.
    /// Returns false if it was no longer running.
    pub async fn fail_snapshot(&self, snapshot_id: i64, reason: &str, failed_at: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE snapshots SET completed_at = ?, status = 'failed' WHERE id = ? AND status = 'running'"
        )
        .bind(failed_at)
        .bind(snapshot_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO scan_errors (snapshot_id, path, error_type, error_message, timestamp)
             VALUES (?, '/', ?, ?, ?)"
        )
        .bind(snapshot_id)
        .bind(ScanErrorKind::Fatal.as_str())
        .bind(reason)
        .bind(failed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Insert a batch of entries in one transaction using multi-row INSERT
    pub async fn insert_entries(&self, snapshot_id: i64, entries: &[EntryRecord]) -> Result<()> {
        // 10 columns per row keeps each statement well below SQLite's bind limit
        const BATCH_SIZE: usize = 2000;

        if entries.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for chunk in entries.chunks(BATCH_SIZE) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                format!("INSERT INTO entries ({ENTRY_COLUMNS}) ")
            );
            qb.push_values(chunk, |mut row, entry| {
                row.push_bind(snapshot_id)
                    .push_bind(entry.path.as_str())
                    .push_bind(entry.name.as_str())
                    .push_bind(entry.size as i64)
                    .push_bind(entry.file_count as i64)
                    .push_bind(entry.dir_count as i64)
                    .push_bind(i64::from(entry.depth))
                    .push_bind(entry.parent_path.as_deref())
                    .push_bind(i64::from(entry.is_dir))
                    .push_bind(entry.error.as_deref());
            });
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Append one scan error
    pub async fn log_error(&self, snapshot_id: i64, error: &ScanErrorRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO scan_errors (snapshot_id, path, error_type, error_message, timestamp)
             VALUES (?, ?, ?, ?, ?)"
        )
        .bind(snapshot_id)
        .bind(&error.path)
        .bind(error.kind.as_str())
        .bind(&error.message)
        .bind(error.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete snapshots completed more than `retention_days` ago (entries and
    /// errors cascade). Running snapshots are never touched. Returns the
    /// number of snapshots removed.
    pub async fn cleanup_old_snapshots(&self, retention_days: u32, now: i64) -> Result<u64> {
        if retention_days == 0 {
            return Ok(0);
        }
        let cutoff = now - i64::from(retention_days) * SECONDS_PER_DAY;
        let result = sqlx::query(
            "DELETE FROM snapshots WHERE completed_at IS NOT NULL AND completed_at < ?"
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    // ------------------------------------------------------------------
    // Read queries
    // ------------------------------------------------------------------

    pub async fn get_snapshot(&self, snapshot_id: i64) -> Result<Option<Snapshot>> {
        sqlx::query(&format!("SELECT {SNAPSHOT_COLUMNS} FROM snapshots WHERE id = ?"))
            .bind(snapshot_id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| snapshot_from_row(&row))
            .transpose()
    }

    /// Most recent completed snapshot, optionally for one mount point
    pub async fn latest_snapshot(&self, mount_point: Option<&str>) -> Result<Option<Snapshot>> {
        Ok(self.recent_completed_snapshots(mount_point, 1).await?.into_iter().next())
    }

    /// The `count` most recently completed snapshots, newest first
    pub async fn recent_completed_snapshots(&self, mount_point: Option<&str>, count: u32) -> Result<Vec<Snapshot>> {
        self.list_snapshots(mount_point, None, count).await
    }

    /// Completed snapshots, newest first, optionally filtered by mount point
    /// and by completion within the last `days` days
    pub async fn list_snapshots(
        &self,
        mount_point: Option<&str>,
        days: Option<u32>,
        limit: u32,
    ) -> Result<Vec<Snapshot>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            format!("SELECT {SNAPSHOT_COLUMNS} FROM snapshots WHERE status = 'completed'")
        );
        if let Some(mount_point) = mount_point {
            qb.push(" AND mount_point = ").push_bind(mount_point);
        }
        if let Some(days) = days {
            let cutoff = crate::util::unix_now() - i64::from(days) * SECONDS_PER_DAY;
            qb.push(" AND completed_at >= ").push_bind(cutoff);
        }
        qb.push(" ORDER BY completed_at DESC, id DESC LIMIT ").push_bind(i64::from(limit));

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(snapshot_from_row).collect()
    }

    /// The running snapshot, if a scan is in flight
    pub async fn running_snapshot(&self) -> Result<Option<Snapshot>> {
        sqlx::query(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM snapshots WHERE status = 'running'
             ORDER BY started_at DESC, id DESC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?
        .map(|row| snapshot_from_row(&row))
        .transpose()
    }

    /// Number of snapshots currently marked running
    pub async fn count_running(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM snapshots WHERE status = 'running'")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    /// Entries of a snapshot, largest first, optionally filtered by parent and depth
    pub async fn entries(
        &self,
        snapshot_id: i64,
        parent_path: Option<&str>,
        depth: Option<u32>,
    ) -> Result<Vec<StoredEntry>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE snapshot_id = ")
        );
        qb.push_bind(snapshot_id);
        if let Some(parent_path) = parent_path {
            qb.push(" AND parent_path = ").push_bind(parent_path);
        }
        if let Some(depth) = depth {
            qb.push(" AND depth = ").push_bind(i64::from(depth));
        }
        qb.push(" ORDER BY size DESC, path ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(entry_from_row).collect())
    }

    pub async fn entry_by_path(&self, snapshot_id: i64, path: &str) -> Result<Option<StoredEntry>> {
        Ok(sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE snapshot_id = ? AND path = ?"
        ))
        .bind(snapshot_id)
        .bind(path)
        .fetch_optional(&self.pool)
        .await?
        .map(|row| entry_from_row(&row)))
    }

    /// Size of `path` across completed snapshots of the last `days` days, oldest first
    pub async fn path_history(&self, path: &str, days: u32) -> Result<Vec<HistoryPoint>> {
        let cutoff = crate::util::unix_now() - i64::from(days) * SECONDS_PER_DAY;
        let rows = sqlx::query(
            "SELECT e.size, e.file_count, e.dir_count, s.completed_at, s.id AS snapshot_id
             FROM entries e
             JOIN snapshots s ON e.snapshot_id = s.id
             WHERE e.path = ? AND s.status = 'completed' AND s.completed_at >= ?
             ORDER BY s.completed_at ASC, s.id ASC"
        )
        .bind(path)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| HistoryPoint {
            snapshot_id: row.get("snapshot_id"),
            completed_at: row.get("completed_at"),
            size: row.get::<i64, _>("size") as u64,
            file_count: row.get::<i64, _>("file_count") as u64,
            dir_count: row.get::<i64, _>("dir_count") as u64,
        }).collect())
    }

    /// Scan errors of a snapshot, newest first
    pub async fn scan_errors(&self, snapshot_id: i64, limit: u32) -> Result<Vec<ScanErrorRecord>> {
        let rows = sqlx::query(
            "SELECT path, error_type, error_message, timestamp FROM scan_errors
             WHERE snapshot_id = ? ORDER BY timestamp DESC, id DESC LIMIT ?"
        )
        .bind(snapshot_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| ScanErrorRecord {
            path: row.get("path"),
            kind: ScanErrorKind::parse(row.get("error_type")),
            message: row.get("error_message"),
            timestamp: row.get("timestamp"),
        }).collect())
    }

    /// Path, name and size of every directory entry of a snapshot
    pub async fn directory_sizes(&self, snapshot_id: i64) -> Result<Vec<DirectorySize>> {
        let rows = sqlx::query(
            "SELECT path, name, size FROM entries WHERE snapshot_id = ? AND is_dir = 1"
        )
        .bind(snapshot_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| DirectorySize {
            path: row.get("path"),
            name: row.get("name"),
            size: row.get::<i64, _>("size") as u64,
        }).collect())
    }
}

fn snapshot_from_row(row: &SqliteRow) -> Result<Snapshot> {
    let status: String = row.get("status");
    Ok(Snapshot {
        id: row.get("id"),
        mount_point: row.get("mount_point"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        totals: ScanTotals {
            size: row.get::<i64, _>("total_size") as u64,
            files: row.get::<i64, _>("total_files") as u64,
            dirs: row.get::<i64, _>("total_dirs") as u64,
        },
        status: status.parse::<SnapshotStatus>()?,
    })
}

fn entry_from_row(row: &SqliteRow) -> StoredEntry {
    StoredEntry {
        snapshot_id: row.get("snapshot_id"),
        entry: EntryRecord {
            path: row.get("path"),
            name: row.get("name"),
            size: row.get::<i64, _>("size") as u64,
            file_count: row.get::<i64, _>("file_count") as u64,
            dir_count: row.get::<i64, _>("dir_count") as u64,
            depth: row.get::<i64, _>("depth") as u32,
            parent_path: row.get("parent_path"),
            is_dir: row.get::<i64, _>("is_dir") != 0,
            error: row.get("error"),
        },
    }
}
