mod cli;
mod report;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use spacetrend::config::Config;
use spacetrend::repository::scanner::{IndicatifObserver, NoopObserver, ScanObserver};
use spacetrend::repository::{Database, GrowthAnalyzer, ScanOrchestrator};
use spacetrend::util::unix_now;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;

    let db_path = config
        .database
        .path
        .to_str()
        .context("Invalid database path encoding")?;
    let db = Database::new(db_path).await?;
    db.init_schema().await?;

    let json = cli.json;
    match cli.command {
        Command::Scan { mount_points } => run_scan(&db, &config, mount_points, json).await?,
        Command::Status => {
            let running = db.running_snapshot().await?;
            report::render(json, &running, || match &running {
                Some(s) => println!("Scan #{} of {} is running", s.id, s.mount_point),
                None => println!("No scan running"),
            })?;
        }
        Command::Snapshots { mount, days, limit } => {
            let snapshots = db.list_snapshots(mount.as_deref(), days, limit).await?;
            report::render(json, &snapshots, || report::print_snapshots(&snapshots))?;
        }
        Command::Latest { mount } => {
            let latest = db.latest_snapshot(mount.as_deref()).await?;
            let rows: Vec<_> = latest.iter().cloned().collect();
            report::render(json, &latest, || report::print_snapshots(&rows))?;
        }
        Command::Browse { snapshot, parent, depth } => {
            let snapshot = match snapshot {
                Some(id) => db.get_snapshot(id).await?,
                None => db.latest_snapshot(None).await?,
            }
            .context("No such snapshot")?;
            // Without filters, show the children of the snapshot root
            let parent = if parent.is_none() && depth.is_none() {
                Some(snapshot.mount_point.clone())
            } else {
                parent
            };
            let entries = db.entries(snapshot.id, parent.as_deref(), depth).await?;
            report::render(json, &entries, || report::print_entries(&entries))?;
        }
        Command::History { path, days } => {
            let history = db.path_history(&path, days).await?;
            report::render(json, &history, || report::print_history(&path, &history))?;
        }
        Command::Growth { limit, mount } => {
            let mut analyzer = GrowthAnalyzer::new(&db);
            if let Some(mount) = mount {
                analyzer = analyzer.for_mount_point(mount);
            }
            let growth = analyzer.top_growth(limit).await?;
            report::render(json, &growth, || report::print_growth(&growth))?;
        }
        Command::Errors { snapshot, limit } => {
            let errors = db.scan_errors(snapshot, limit).await?;
            report::render(json, &errors, || report::print_errors(&errors))?;
        }
        Command::Cleanup { days } => {
            let days = days.unwrap_or(config.retention.days);
            let removed = db.cleanup_old_snapshots(days, unix_now()).await?;
            info!(removed, days, "cleaned up old snapshots");
            report::render(json, &removed, || println!("Removed {} snapshot(s)", removed))?;
        }
    }

    Ok(())
}

async fn run_scan(db: &Database, config: &Config, mount_points: Vec<String>, json: bool) -> Result<()> {
    let mount_points = if mount_points.is_empty() {
        config.scanner.mount_points.clone()
    } else {
        mount_points
    };

    let observer: Arc<dyn ScanObserver> = if json {
        Arc::new(NoopObserver)
    } else {
        Arc::new(IndicatifObserver::new())
    };
    let orchestrator = ScanOrchestrator::new(config.scan_options()).with_observer(observer);

    let cancel = orchestrator.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling scan");
            cancel.cancel();
        }
    });

    let outcomes = orchestrator.run(db, &mount_points).await?;

    let removed = db.cleanup_old_snapshots(config.retention.days, unix_now()).await?;
    if removed > 0 {
        info!(removed, days = config.retention.days, "cleaned up old snapshots");
    }

    report::render(json, &outcomes, || report::print_outcomes(&outcomes))?;

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    if failed > 0 {
        bail!("{} of {} mount point(s) failed", failed, outcomes.len());
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "spacetrend=debug" } else { "spacetrend=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
