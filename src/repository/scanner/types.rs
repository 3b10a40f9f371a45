//! Domain types for filesystem scanning
//!
//! These types form the data contract between the walker, the writer and
//! the orchestrator.

use serde::Serialize;

use crate::model::{EntryRecord, ScanErrorRecord, ScanTotals};

/// Default number of entries persisted per transaction
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// A fully aggregated directory, emitted once all its children are done
#[derive(Debug, Clone)]
pub struct DirAggregate {
    pub entry: EntryRecord,
    /// Bytes of files directly inside this directory
    pub direct_size: u64,
    /// Files directly inside this directory
    pub direct_files: u64,
}

/// What the walker streams to the orchestrator, in post-order
#[derive(Debug, Clone)]
pub enum WalkEvent {
    Directory(DirAggregate),
    Error(ScanErrorRecord),
}

/// How a walk ended without a fatal error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    Finished,
    Cancelled,
}

/// Per-scan tuning supplied by the configuration provider
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub skip_paths: Vec<String>,
    /// 0 = unlimited
    pub max_depth: u32,
    pub batch_size: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            skip_paths: Vec::new(),
            max_depth: 0,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Running counters for a scan in progress
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanProgress {
    pub current_path: String,
    pub dirs_scanned: u64,
    pub files_scanned: u64,
    pub bytes_scanned: u64,
    pub errors: u64,
}

impl ScanProgress {
    pub fn record(&mut self, dir: &DirAggregate) {
        self.dirs_scanned += 1;
        self.files_scanned += dir.direct_files;
        self.bytes_scanned += dir.direct_size;
        self.current_path.clone_from(&dir.entry.path);
    }

    pub fn totals(&self) -> ScanTotals {
        ScanTotals {
            size: self.bytes_scanned,
            files: self.files_scanned,
            dirs: self.dirs_scanned,
        }
    }
}

/// Result of one successful mount point scan
#[derive(Debug, Clone, Serialize)]
pub struct ScanStats {
    pub snapshot_id: i64,
    pub mount_point: String,
    pub totals: ScanTotals,
    pub errors: u64,
    pub started_at: i64,
    pub completed_at: i64,
}

/// Per mount point result of a multi-mount run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum MountOutcome {
    Success { mount_point: String, stats: ScanStats },
    Failed { mount_point: String, error: String },
}

impl MountOutcome {
    pub fn mount_point(&self) -> &str {
        match self {
            Self::Success { mount_point, .. } | Self::Failed { mount_point, .. } => mount_point,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
