//! Scan status notification
//!
//! Decouples scanning logic from whoever listens (CLI spinner, API layer).
//! Delivery is best-effort: observers must return promptly and may drop
//! events, which never affects scan correctness.

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::util::format_size;

use super::types::{ScanProgress, ScanStats};

/// Lifecycle and progress events of a scan
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    ScanStarted { snapshot_id: i64, mount_point: String },
    ScanProgress(ScanProgress),
    ScanCompleted(ScanStats),
    ScanFailed { mount_point: String, error: String },
}

/// Receiver of scan events. Must not block.
pub trait ScanObserver: Send + Sync {
    fn notify(&self, event: ScanEvent);
}

/// Observer that ignores everything
pub struct NoopObserver;

impl ScanObserver for NoopObserver {
    fn notify(&self, _event: ScanEvent) {}
}

/// Forwards events into a bounded channel, dropping them when the
/// receiver lags behind or has gone away
pub struct ChannelObserver {
    tx: mpsc::Sender<ScanEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::Sender<ScanEvent>) -> Self {
        Self { tx }
    }

    /// Observer plus the receiving end of a channel holding up to `capacity` events
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ScanEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

impl ScanObserver for ChannelObserver {
    fn notify(&self, event: ScanEvent) {
        let _ = self.tx.try_send(event);
    }
}

/// Indicatif spinner for CLI usage
pub struct IndicatifObserver {
    bar: ProgressBar,
}

impl IndicatifObserver {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }
}

impl Default for IndicatifObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanObserver for IndicatifObserver {
    fn notify(&self, event: ScanEvent) {
        match event {
            ScanEvent::ScanStarted { mount_point, .. } => {
                self.bar.set_message(format!("Scanning {mount_point}..."));
            }
            ScanEvent::ScanProgress(p) => {
                self.bar.set_message(format!(
                    "{} dirs, {} files, {} | {}",
                    p.dirs_scanned,
                    p.files_scanned,
                    format_size(p.bytes_scanned),
                    p.current_path
                ));
            }
            ScanEvent::ScanCompleted(stats) => {
                self.bar.println(format!(
                    "{}: {} dirs, {} files, {} ({} errors)",
                    stats.mount_point,
                    stats.totals.dirs,
                    stats.totals.files,
                    format_size(stats.totals.size),
                    stats.errors
                ));
                self.bar.set_message("");
            }
            ScanEvent::ScanFailed { mount_point, error } => {
                self.bar.println(format!("{mount_point}: failed: {error}"));
                self.bar.set_message("");
            }
        }
    }
}

impl Drop for IndicatifObserver {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_observer_drops_when_full() {
        let (observer, mut rx) = ChannelObserver::channel(1);
        observer.notify(ScanEvent::ScanProgress(ScanProgress::default()));
        observer.notify(ScanEvent::ScanFailed {
            mount_point: "/".into(),
            error: "x".into(),
        });

        assert!(matches!(rx.try_recv(), Ok(ScanEvent::ScanProgress(_))));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_observer_survives_closed_receiver() {
        let (observer, rx) = ChannelObserver::channel(4);
        drop(rx);
        observer.notify(ScanEvent::ScanProgress(ScanProgress::default()));
    }

    #[test]
    fn test_event_serialization() {
        let event = ScanEvent::ScanStarted { snapshot_id: 7, mount_point: "/srv".into() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "scan_started");
        assert_eq!(json["snapshot_id"], 7);
    }
}
