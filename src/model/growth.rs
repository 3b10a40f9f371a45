use serde::Serialize;

/// Size change of one directory between two completed snapshots
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthEntry {
    pub path: String,
    pub name: String,
    pub current_size: u64,
    /// `None` when the directory did not exist in the previous snapshot
    pub previous_size: Option<u64>,
    pub growth: u64,
    pub growth_percent: f64,
}
