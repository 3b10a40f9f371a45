use std::io;
use thiserror::Error;

/// Failures that abort a scan attempt.
///
/// Per-file and per-directory access problems never show up here; they are
/// recorded as scan errors and the walk carries on.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scan already in progress")]
    AlreadyRunning,

    #[error("mount point does not exist: {0}")]
    InvalidMountPoint(String),

    #[error("cannot read scan root {path}: {source}")]
    RootUnreadable {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    Store(#[from] anyhow::Error),

    #[error("scan worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl ScanError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
