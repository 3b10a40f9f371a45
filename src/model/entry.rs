use serde::Serialize;

/// Size record for one directory (or file) within a snapshot.
///
/// `size`, `file_count` and `dir_count` are cumulative: they cover the
/// directory itself and everything beneath it that was not skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryRecord {
    pub path: String,
    pub name: String,
    pub size: u64,
    pub file_count: u64,
    pub dir_count: u64,
    /// Distance from the scan root (root = 0)
    pub depth: u32,
    /// Immediate container, `None` only for the scan root
    pub parent_path: Option<String>,
    pub is_dir: bool,
    pub error: Option<String>,
}

/// A persisted entry together with its owning snapshot
#[derive(Debug, Clone, Serialize)]
pub struct StoredEntry {
    pub snapshot_id: i64,
    #[serde(flatten)]
    pub entry: EntryRecord,
}

/// One point of a path's size history
#[derive(Debug, Clone, Serialize)]
pub struct HistoryPoint {
    pub snapshot_id: i64,
    pub completed_at: i64,
    pub size: u64,
    pub file_count: u64,
    pub dir_count: u64,
}
