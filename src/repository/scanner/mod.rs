//! Filesystem scan engine
//!
//! Measures a directory tree bottom-up and persists one snapshot per mount
//! point.
//!
//! # Architecture
//!
//! - **filter**: which subtrees are never scanned
//! - **aggregator**: post-order walk producing cumulative per-directory sizes
//! - **store**: persistence trait the scan writes through
//! - **db_store**: Database implementation of SnapshotStore
//! - **writer**: batching and snapshot lifecycle on top of a store
//! - **progress**: observer abstraction for status events
//! - **types**: data passed between the layers
//! - **ScanOrchestrator** (this module): drives one scan attempt

mod aggregator;
mod db_store;
mod error;
mod filter;
mod progress;
mod store;
mod types;
mod writer;

pub use aggregator::{CancelHandle, DirectoryAggregator};
pub use error::ScanError;
pub use filter::{PathFilter, BUILTIN_SKIP_PATHS};
pub use progress::{ChannelObserver, IndicatifObserver, NoopObserver, ScanEvent, ScanObserver};
pub use store::SnapshotStore;
pub use types::{
    DirAggregate, MountOutcome, ScanOptions, ScanProgress, ScanStats, WalkEvent, WalkOutcome,
    DEFAULT_BATCH_SIZE,
};
pub use writer::SnapshotWriter;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::util::{format_size, normalize_path, path_string};

/// Events the walker may run ahead of persistence
pub const WALK_CHANNEL_CAPACITY: usize = 256;

/// Releases the single running slot when a scan attempt ends
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives scans: one attempt at a time per orchestrator, cooperative
/// cancellation, progress forwarded to an observer.
pub struct ScanOrchestrator {
    options: ScanOptions,
    filter: PathFilter,
    observer: Arc<dyn ScanObserver>,
    running: AtomicBool,
    cancel: CancelHandle,
}

impl ScanOrchestrator {
    pub fn new(options: ScanOptions) -> Self {
        let filter = PathFilter::new(&options.skip_paths);
        Self {
            options,
            filter,
            observer: Arc::new(NoopObserver),
            running: AtomicBool::new(false),
            cancel: CancelHandle::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ScanObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Handle for requesting cancellation from elsewhere (signal handler, API)
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Claim the running slot, failing fast if a scan is already in flight
    fn try_start(&self) -> Result<RunningGuard<'_>, ScanError> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ScanError::AlreadyRunning)?;
        self.cancel.reset();
        Ok(RunningGuard(&self.running))
    }

    /// Scan a single mount point
    pub async fn scan(&self, store: &impl SnapshotStore, mount_point: &str) -> Result<ScanStats, ScanError> {
        let _guard = self.try_start()?;
        self.scan_mount(store, mount_point).await
    }

    /// Scan several mount points one after another. A failing mount point
    /// does not stop the others; each gets its own outcome. After a
    /// cancellation the remaining mount points are reported as cancelled
    /// without being started.
    pub async fn run(
        &self,
        store: &impl SnapshotStore,
        mount_points: &[String],
    ) -> Result<Vec<MountOutcome>, ScanError> {
        let _guard = self.try_start()?;
        let mut outcomes = Vec::with_capacity(mount_points.len());

        for mount_point in mount_points {
            if self.cancel.is_cancelled() {
                outcomes.push(MountOutcome::Failed {
                    mount_point: mount_point.clone(),
                    error: ScanError::Cancelled.to_string(),
                });
                continue;
            }
            let outcome = match self.scan_mount(store, mount_point).await {
                Ok(stats) => MountOutcome::Success {
                    mount_point: mount_point.clone(),
                    stats,
                },
                Err(err) => MountOutcome::Failed {
                    mount_point: mount_point.clone(),
                    error: err.to_string(),
                },
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    async fn scan_mount<S: SnapshotStore>(&self, store: &S, mount_point: &str) -> Result<ScanStats, ScanError> {
        let root = std::path::absolute(mount_point)
            .map(|path| normalize_path(&path))
            .map_err(|_| ScanError::InvalidMountPoint(mount_point.to_string()))?;
        let mount_point = path_string(&root);
        info!(mount_point = %mount_point, "starting scan");

        let mut writer = match SnapshotWriter::begin(store, &mount_point, self.options.batch_size).await {
            Ok(writer) => writer,
            Err(err) => {
                error!(mount_point = %mount_point, error = %err, "cannot create snapshot");
                let err = ScanError::Store(err);
                self.notify_failed(&mount_point, &err);
                return Err(err);
            }
        };
        let snapshot_id = writer.snapshot_id();
        self.observer.notify(ScanEvent::ScanStarted {
            snapshot_id,
            mount_point: mount_point.clone(),
        });

        let progress = match self.drive(&mut writer, &root).await {
            Ok(progress) => progress,
            Err(err) => {
                if err.is_cancelled() {
                    warn!(snapshot = snapshot_id, "scan cancelled");
                } else {
                    error!(snapshot = snapshot_id, error = %err, "scan failed");
                }
                if let Err(fail_err) = writer.fail(&err.to_string()).await {
                    warn!(snapshot = snapshot_id, error = %fail_err, "could not mark snapshot failed");
                }
                self.notify_failed(&mount_point, &err);
                return Err(err);
            }
        };

        let totals = progress.totals();
        let started_at = writer.started_at();
        let entries = writer.entries_written();
        let errors_logged = writer.errors_logged();
        let completed_at = match writer.complete(totals).await {
            Ok(completed_at) => completed_at,
            Err(err) => {
                error!(snapshot = snapshot_id, error = %err, "cannot complete snapshot");
                let err = ScanError::Store(err);
                self.notify_failed(&mount_point, &err);
                return Err(err);
            }
        };

        info!(
            snapshot = snapshot_id,
            dirs = totals.dirs,
            files = totals.files,
            size = %format_size(totals.size),
            entries,
            errors = errors_logged,
            "scan completed"
        );

        let stats = ScanStats {
            snapshot_id,
            mount_point,
            totals,
            errors: progress.errors,
            started_at,
            completed_at,
        };
        self.observer.notify(ScanEvent::ScanCompleted(stats.clone()));
        Ok(stats)
    }

    /// Run the walker on a blocking thread and persist what it streams back.
    /// On cancellation the buffered batch is still flushed before returning.
    async fn drive<S: SnapshotStore>(
        &self,
        writer: &mut SnapshotWriter<'_, S>,
        root: &Path,
    ) -> Result<ScanProgress, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::InvalidMountPoint(path_string(root)));
        }

        let aggregator = DirectoryAggregator::new(root, &self.filter, self.options.max_depth)
            .with_cancel(self.cancel.clone());
        let (tx, mut rx) = mpsc::channel::<WalkEvent>(WALK_CHANNEL_CAPACITY);
        let walker = tokio::task::spawn_blocking(move || {
            aggregator.walk(|event| tx.blocking_send(event).is_ok())
        });

        let mut progress = ScanProgress::default();
        while let Some(event) = rx.recv().await {
            match event {
                WalkEvent::Directory(dir) => {
                    progress.record(&dir);
                    if writer.push(dir.entry).await? {
                        self.observer.notify(ScanEvent::ScanProgress(progress.clone()));
                    }
                }
                WalkEvent::Error(err) => {
                    progress.errors += 1;
                    writer.log_error(&err).await?;
                }
            }
        }

        let outcome = walker.await??;
        writer.flush().await?;

        match outcome {
            WalkOutcome::Finished => Ok(progress),
            WalkOutcome::Cancelled => Err(ScanError::Cancelled),
        }
    }

    fn notify_failed(&self, mount_point: &str, err: &ScanError) {
        self.observer.notify(ScanEvent::ScanFailed {
            mount_point: mount_point.to_string(),
            error: err.to_string(),
        });
    }
}
