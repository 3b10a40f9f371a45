//! Batched snapshot persistence

use anyhow::{ensure, Result};
use tracing::{debug, warn};

use crate::model::{EntryRecord, ScanErrorRecord, ScanTotals};
use crate::util::unix_now;

use super::store::SnapshotStore;

/// Owns one running snapshot: buffers entries into fixed-size batches,
/// logs errors as they arrive and applies exactly one terminal transition.
///
/// `complete` and `fail` consume the writer, so a finished snapshot can no
/// longer be written through it.
pub struct SnapshotWriter<'a, S: SnapshotStore> {
    store: &'a S,
    snapshot_id: i64,
    started_at: i64,
    batch: Vec<EntryRecord>,
    batch_size: usize,
    entries_written: u64,
    errors_logged: u64,
}

impl<'a, S: SnapshotStore> SnapshotWriter<'a, S> {
    /// Create the running snapshot row
    pub async fn begin(store: &'a S, mount_point: &str, batch_size: usize) -> Result<Self> {
        let started_at = unix_now();
        let snapshot_id = store.create_snapshot(mount_point, started_at).await?;
        let batch_size = batch_size.max(1);
        Ok(Self {
            store,
            snapshot_id,
            started_at,
            batch: Vec::with_capacity(batch_size),
            batch_size,
            entries_written: 0,
            errors_logged: 0,
        })
    }

    pub fn snapshot_id(&self) -> i64 {
        self.snapshot_id
    }

    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    pub fn errors_logged(&self) -> u64 {
        self.errors_logged
    }

    /// Buffer one entry, flushing when the batch is full.
    /// Returns true if this call flushed a batch.
    pub async fn push(&mut self, entry: EntryRecord) -> Result<bool> {
        self.batch.push(entry);
        if self.batch.len() < self.batch_size {
            return Ok(false);
        }
        self.flush().await?;
        Ok(true)
    }

    /// Persist one error immediately, independent of the batch cadence
    pub async fn log_error(&mut self, error: &ScanErrorRecord) -> Result<()> {
        self.store.log_error(self.snapshot_id, error).await?;
        self.errors_logged += 1;
        Ok(())
    }

    /// Persist whatever is buffered as one transaction
    pub async fn flush(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        self.store.insert_entries(self.snapshot_id, &self.batch).await?;
        self.entries_written += self.batch.len() as u64;
        debug!(snapshot = self.snapshot_id, batch = self.batch.len(), total = self.entries_written, "flushed entries");
        self.batch.clear();
        Ok(())
    }

    /// Flush the remainder and mark the snapshot completed. If that fails,
    /// the snapshot is marked failed with the error so it is not left running.
    pub async fn complete(mut self, totals: ScanTotals) -> Result<i64> {
        let result = self.try_complete(totals).await;
        if let Err(err) = &result {
            let reason = err.to_string();
            match self.store.fail_snapshot(self.snapshot_id, &reason, unix_now()).await {
                Ok(_) => debug!(snapshot = self.snapshot_id, "marked failed after completion error"),
                Err(fail_err) => {
                    warn!(snapshot = self.snapshot_id, error = %fail_err, "could not mark snapshot failed")
                }
            }
        }
        result
    }

    async fn try_complete(&mut self, totals: ScanTotals) -> Result<i64> {
        self.flush().await?;
        let completed_at = unix_now();
        let updated = self
            .store
            .complete_snapshot(self.snapshot_id, totals, completed_at)
            .await?;
        ensure!(updated, "snapshot {} is no longer running", self.snapshot_id);
        Ok(completed_at)
    }

    /// Mark the snapshot failed with `reason`. Buffered entries are dropped;
    /// call [`flush`](Self::flush) first to keep them.
    pub async fn fail(self, reason: &str) -> Result<()> {
        let updated = self
            .store
            .fail_snapshot(self.snapshot_id, reason, unix_now())
            .await?;
        ensure!(updated, "snapshot {} is no longer running", self.snapshot_id);
        Ok(())
    }
}
