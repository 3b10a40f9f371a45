// Terminal rendering for CLI results

use anyhow::Result;
use serde::Serialize;

use spacetrend::model::{GrowthEntry, HistoryPoint, ScanErrorRecord, Snapshot, StoredEntry};
use spacetrend::repository::scanner::MountOutcome;
use spacetrend::util::{format_size, format_timestamp};

/// Print `value` as pretty JSON, or run `human` for table output
pub fn render<T: Serialize + ?Sized>(json: bool, value: &T, human: impl FnOnce()) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human();
    }
    Ok(())
}

pub fn print_outcomes(outcomes: &[MountOutcome]) {
    for outcome in outcomes {
        match outcome {
            MountOutcome::Success { mount_point, stats } => println!(
                "{:<30} ok      snapshot #{:<6} {:>10}  {} files  {} dirs  {} errors",
                mount_point,
                stats.snapshot_id,
                format_size(stats.totals.size),
                stats.totals.files,
                stats.totals.dirs,
                stats.errors
            ),
            MountOutcome::Failed { mount_point, error } => {
                println!("{:<30} failed  {}", mount_point, error)
            }
        }
    }
}

pub fn print_snapshots(snapshots: &[Snapshot]) {
    if snapshots.is_empty() {
        println!("No snapshots");
        return;
    }
    println!("{:>6}  {:<20} {:<10} {:>10} {:>10} {:>8}  {}", "ID", "COMPLETED", "STATUS", "SIZE", "FILES", "DIRS", "MOUNT");
    for s in snapshots {
        println!(
            "{:>6}  {:<20} {:<10} {:>10} {:>10} {:>8}  {}",
            s.id,
            s.completed_at.map(format_timestamp).unwrap_or_else(|| "-".to_string()),
            s.status,
            format_size(s.totals.size),
            s.totals.files,
            s.totals.dirs,
            s.mount_point
        );
    }
}

pub fn print_entries(entries: &[StoredEntry]) {
    if entries.is_empty() {
        println!("No entries");
        return;
    }
    for stored in entries {
        let e = &stored.entry;
        let marker = if e.error.is_some() { " !" } else { "" };
        println!(
            "{:>10}  {:>8} files  {:>6} dirs  {}{}",
            format_size(e.size),
            e.file_count,
            e.dir_count,
            e.path,
            marker
        );
    }
}

pub fn print_history(path: &str, history: &[HistoryPoint]) {
    if history.is_empty() {
        println!("No history for {}", path);
        return;
    }
    println!("History of {}", path);
    for point in history {
        println!(
            "  {:<20} #{:<6} {:>10}  {} files",
            format_timestamp(point.completed_at),
            point.snapshot_id,
            format_size(point.size),
            point.file_count
        );
    }
}

pub fn print_growth(growth: &[GrowthEntry]) {
    if growth.is_empty() {
        println!("No growth (need at least two completed snapshots)");
        return;
    }
    for g in growth {
        println!(
            "{:>10}  {:>8.2}%  {:>10} -> {:>10}  {}",
            format_size(g.growth),
            g.growth_percent,
            g.previous_size.map(format_size).unwrap_or_else(|| "new".to_string()),
            format_size(g.current_size),
            g.path
        );
    }
}

pub fn print_errors(errors: &[ScanErrorRecord]) {
    if errors.is_empty() {
        println!("No errors");
        return;
    }
    for e in errors {
        println!("{:<20} {:<18} {}  {}", format_timestamp(e.timestamp), e.kind, e.path, e.message);
    }
}
