//! Snapshot store trait for persistence abstraction
//!
//! Decouples scanning logic from database implementation details.

use anyhow::Result;

use crate::model::{EntryRecord, ScanErrorRecord, ScanTotals};

/// Persistence layer for scan data
///
/// This trait abstracts the writes a scan performs, allowing the
/// orchestration logic to be tested against wrapped or failing stores.
/// Every method must be transactional on its own.
#[allow(async_fn_in_trait)]
pub trait SnapshotStore {
    /// Create a running snapshot and return its id
    async fn create_snapshot(&self, mount_point: &str, started_at: i64) -> Result<i64>;

    /// Persist a non-empty batch of entries in one transaction
    async fn insert_entries(&self, snapshot_id: i64, entries: &[EntryRecord]) -> Result<()>;

    /// Append one access error as soon as it is discovered
    async fn log_error(&self, snapshot_id: i64, error: &ScanErrorRecord) -> Result<()>;

    /// Transition running -> completed. Returns false if the snapshot was
    /// already terminal.
    async fn complete_snapshot(&self, snapshot_id: i64, totals: ScanTotals, completed_at: i64) -> Result<bool>;

    /// Transition running -> failed and record `reason` as a fatal error at
    /// `/`. Returns false if the snapshot was already terminal.
    async fn fail_snapshot(&self, snapshot_id: i64, reason: &str, failed_at: i64) -> Result<bool>;
}
