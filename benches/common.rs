// Shared benchmark helpers
// Functions here are used across different benchmark files
#![allow(dead_code)]

use spacetrend::model::EntryRecord;
use spacetrend::repository::Database;
use std::fs;
use tempfile::TempDir;

/// Generate a directory tree with `num_dirs` directories spread over a
/// few levels, each holding `files_per_dir` small files
pub fn generate_fs_tree(num_dirs: usize, files_per_dir: usize) -> TempDir {
    let dir = TempDir::new().unwrap();
    let levels = ["src", "lib", "pkg", "mod"];

    for i in 0..num_dirs {
        let depth = (i % levels.len()) + 1;
        let mut path = dir.path().to_path_buf();
        for level in levels.iter().take(depth) {
            path.push(format!("{}_{}", level, i / 100));
        }
        path.push(format!("dir_{}", i));
        fs::create_dir_all(&path).unwrap();
        for f in 0..files_per_dir {
            fs::write(path.join(format!("file_{}.bin", f)), vec![0u8; (f + 1) * 16]).unwrap();
        }
    }
    dir
}

/// Generate entry records for database benchmarks
pub fn generate_entries(num_entries: usize) -> Vec<EntryRecord> {
    (0..num_entries)
        .map(|i| {
            let parent = format!("/data/dir_{}", i % 100);
            EntryRecord {
                path: format!("{}/sub_{}", parent, i),
                name: format!("sub_{}", i),
                size: (i * 100) as u64,
                file_count: (i % 50) as u64,
                dir_count: (i % 7) as u64,
                depth: 2,
                parent_path: Some(parent),
                is_dir: true,
                error: None,
            }
        })
        .collect()
}

/// Create a fresh database for benchmarks
pub async fn setup_bench_db() -> Database {
    let db = Database::new(":memory:").await.unwrap();
    db.init_schema().await.unwrap();
    db
}
