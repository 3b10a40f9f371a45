mod database;
mod growth;
pub mod scanner;

pub use database::{Database, SCHEMA_VERSION_KEY};
pub use growth::{rank_growth, DirectorySize, GrowthAnalyzer};
pub use scanner::{ScanError, ScanOptions, ScanOrchestrator, SnapshotStore};

// Re-export the schema version for callers who need it
pub const SCHEMA_VERSION: &str = "1";
