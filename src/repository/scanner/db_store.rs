//! Database implementation of SnapshotStore

use anyhow::Result;

use crate::model::{EntryRecord, ScanErrorRecord, ScanTotals};
use crate::repository::Database;

use super::store::SnapshotStore;

impl SnapshotStore for Database {
    async fn create_snapshot(&self, mount_point: &str, started_at: i64) -> Result<i64> {
        Database::create_snapshot(self, mount_point, started_at).await
    }

    async fn insert_entries(&self, snapshot_id: i64, entries: &[EntryRecord]) -> Result<()> {
        Database::insert_entries(self, snapshot_id, entries).await
    }

    async fn log_error(&self, snapshot_id: i64, error: &ScanErrorRecord) -> Result<()> {
        Database::log_error(self, snapshot_id, error).await
    }

    async fn complete_snapshot(&self, snapshot_id: i64, totals: ScanTotals, completed_at: i64) -> Result<bool> {
        Database::complete_snapshot(self, snapshot_id, totals, completed_at).await
    }

    async fn fail_snapshot(&self, snapshot_id: i64, reason: &str, failed_at: i64) -> Result<bool> {
        Database::fail_snapshot(self, snapshot_id, reason, failed_at).await
    }
}
