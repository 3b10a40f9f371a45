//! Growth analysis between the two most recent completed snapshots

use anyhow::Result;
use rustc_hash::FxHashMap;

use crate::model::GrowthEntry;

use super::Database;

/// Size of one directory entry, as needed for growth comparison
#[derive(Debug, Clone)]
pub struct DirectorySize {
    pub path: String,
    pub name: String,
    pub size: u64,
}

/// Ranks directories by absolute growth between the latest completed
/// snapshot and the one completed just before it.
///
/// Read-only: it only ever looks at snapshots already marked completed,
/// so it can run while a scan is in progress.
pub struct GrowthAnalyzer<'a> {
    db: &'a Database,
    mount_point: Option<String>,
}

impl<'a> GrowthAnalyzer<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db, mount_point: None }
    }

    /// Restrict the comparison to snapshots of one mount point
    pub fn for_mount_point(mut self, mount_point: impl Into<String>) -> Self {
        self.mount_point = Some(mount_point.into());
        self
    }

    /// Top `limit` directories by positive growth. Empty when fewer than
    /// two completed snapshots exist.
    pub async fn top_growth(&self, limit: usize) -> Result<Vec<GrowthEntry>> {
        let recent = self
            .db
            .recent_completed_snapshots(self.mount_point.as_deref(), 2)
            .await?;

        let [latest, previous] = recent.as_slice() else {
            return Ok(Vec::new());
        };

        let current = self.db.directory_sizes(latest.id).await?;
        let baseline = self.db.directory_sizes(previous.id).await?;
        Ok(rank_growth(current, &baseline, limit))
    }
}

/// Compare `current` against `previous` by path and return the `limit`
/// largest strictly positive growths, largest first.
///
/// A path missing from `previous` counts its full size as growth and is
/// reported at 100%.
pub fn rank_growth(current: Vec<DirectorySize>, previous: &[DirectorySize], limit: usize) -> Vec<GrowthEntry> {
    let baseline: FxHashMap<&str, u64> = previous
        .iter()
        .map(|d| (d.path.as_str(), d.size))
        .collect();

    let mut growth: Vec<GrowthEntry> = current
        .into_iter()
        .filter_map(|dir| {
            let previous_size = baseline.get(dir.path.as_str()).copied();
            let delta = dir.size.checked_sub(previous_size.unwrap_or(0))?;
            if delta == 0 {
                return None;
            }
            let growth_percent = match previous_size {
                Some(prev) if prev > 0 => round2(delta as f64 * 100.0 / prev as f64),
                _ => 100.0,
            };
            Some(GrowthEntry {
                path: dir.path,
                name: dir.name,
                current_size: dir.size,
                previous_size,
                growth: delta,
                growth_percent,
            })
        })
        .collect();

    growth.sort_by(|a, b| b.growth.cmp(&a.growth).then_with(|| a.path.cmp(&b.path)));
    growth.truncate(limit);
    growth
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
