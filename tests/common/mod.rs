// Shared test fixtures for integration tests
// Functions here are used across different test files
#![allow(dead_code)]

use spacetrend::model::{EntryRecord, StoredEntry};
use spacetrend::repository::Database;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Create an in-memory test database
pub async fn create_test_db() -> Database {
    Database::new(":memory:").await.unwrap()
}

/// Create an in-memory test database with initialized schema
pub async fn setup_db() -> Database {
    let db = create_test_db().await;
    db.init_schema().await.unwrap();
    db
}

pub fn write_bytes(path: &Path, n: usize) {
    fs::write(path, vec![0u8; n]).unwrap();
}

/// Create a reproducible directory tree:
///
/// ```text
/// root/
///   alpha/
///     a.txt   (100 bytes)
///     b.rs    (200 bytes)
///   beta/
///     c.png   (300 bytes)
///   d.zip     (400 bytes)
/// ```
///
/// Total file bytes: 1 000.
pub fn build_test_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("alpha")).unwrap();
    fs::create_dir_all(root.join("beta")).unwrap();
    write_bytes(&root.join("alpha/a.txt"), 100);
    write_bytes(&root.join("alpha/b.rs"), 200);
    write_bytes(&root.join("beta/c.png"), 300);
    write_bytes(&root.join("d.zip"), 400);
    dir
}

pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Build a directory entry record
pub fn dir_entry(path: &str, size: u64, depth: u32, parent: Option<&str>) -> EntryRecord {
    EntryRecord {
        path: path.to_string(),
        name: path.rsplit('/').next().unwrap_or(path).to_string(),
        size,
        file_count: 0,
        dir_count: 0,
        depth,
        parent_path: parent.map(str::to_string),
        is_dir: true,
        error: None,
    }
}

/// Check the aggregation invariants of a scanned snapshot against the
/// filesystem: every directory's totals equal its direct files plus its
/// persisted children, and depth grows by one per level.
pub fn assert_aggregation_invariants(entries: &[StoredEntry]) {
    let by_path: HashMap<&str, &EntryRecord> = entries
        .iter()
        .map(|e| (e.entry.path.as_str(), &e.entry))
        .collect();

    for stored in entries {
        let entry = &stored.entry;
        let children: Vec<&EntryRecord> = entries
            .iter()
            .map(|e| &e.entry)
            .filter(|e| e.parent_path.as_deref() == Some(entry.path.as_str()))
            .collect();

        let (direct_size, direct_files) = fs::read_dir(&entry.path)
            .map(|dir| {
                dir.filter_map(Result::ok)
                    .filter(|e| e.file_type().map(|t| !t.is_dir()).unwrap_or(false))
                    .filter_map(|e| fs::symlink_metadata(e.path()).ok())
                    .fold((0u64, 0u64), |(size, count), meta| (size + meta.len(), count + 1))
            })
            .unwrap_or((0, 0));

        assert_eq!(
            entry.size,
            direct_size + children.iter().map(|c| c.size).sum::<u64>(),
            "size of {}",
            entry.path
        );
        assert_eq!(
            entry.file_count,
            direct_files + children.iter().map(|c| c.file_count).sum::<u64>(),
            "file_count of {}",
            entry.path
        );
        assert_eq!(
            entry.dir_count,
            children.len() as u64 + children.iter().map(|c| c.dir_count).sum::<u64>(),
            "dir_count of {}",
            entry.path
        );

        if let Some(parent) = entry.parent_path.as_deref() {
            let parent = by_path[parent];
            assert_eq!(entry.depth, parent.depth + 1, "depth of {}", entry.path);
        } else {
            assert_eq!(entry.depth, 0);
        }
    }
}
