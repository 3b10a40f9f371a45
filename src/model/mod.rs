mod entry;
mod growth;
mod scan_error;
mod snapshot;

pub use entry::{EntryRecord, HistoryPoint, StoredEntry};
pub use growth::GrowthEntry;
pub use scan_error::{ScanErrorKind, ScanErrorRecord};
pub use snapshot::{ScanTotals, Snapshot, SnapshotStatus};
