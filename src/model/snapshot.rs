use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    Running,
    Completed,
    Failed,
}

impl SnapshotStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SnapshotStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => anyhow::bail!("unknown snapshot status: {other}"),
        }
    }
}

/// Aggregate totals recorded when a snapshot completes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanTotals {
    pub size: u64,
    pub files: u64,
    pub dirs: u64,
}

/// One scan session over a mount point
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub id: i64,
    pub mount_point: String,
    /// Unix seconds
    pub started_at: i64,
    /// Unix seconds, absent while running
    pub completed_at: Option<i64>,
    pub totals: ScanTotals,
    pub status: SnapshotStatus,
}

impl Snapshot {
    pub fn is_completed(&self) -> bool {
        self.status == SnapshotStatus::Completed
    }
}
