//! Per-file ingestion events.
//!
//! [`ingest_from_path`](super::ingest_from_path) reports each source once: `on_success` with its
//! [`IngestionStats`], or `on_failure` with a severity (plus `on_alert` when that severity reaches
//! the configured threshold). The batch run hands one observer to every file, so a single
//! [`FileObserver`] collects the event log of a whole day.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Local;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::IngestionError;

use super::result::{IngestMode, IngestResult};
use super::unified::IngestionFormat;

/// How bad a failed source is. Ordered, so thresholds compare with `>=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionSeverity {
    Info,
    Warning,
    /// The source itself is unusable (empty, undecodable, not tabular); the run goes on.
    Error,
    /// The environment is broken: unreadable paths, bad configuration.
    Critical,
}

/// Which source an event is about.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    pub path: PathBuf,
    pub format: IngestionFormat,
}

/// What a successful ingestion produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionStats {
    /// Valid data rows; rows scanned when streamed.
    pub rows: usize,
    pub skipped_rows: usize,
    pub mode: IngestMode,
    /// Streaming stopped at `max_rows_scanned` before the end of the file.
    pub truncated: bool,
}

impl IngestionStats {
    pub fn from_result(result: &IngestResult) -> Self {
        Self {
            rows: result.row_count,
            skipped_rows: result.skipped_rows,
            mode: result.mode,
            truncated: result.truncated,
        }
    }
}

/// Receives one event per ingested source. Every callback defaults to a no-op.
pub trait IngestionObserver: Send + Sync {
    fn on_success(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &IngestionError) {}

    /// Failure at or above the alert threshold. Sent after `on_failure`; defaults to forwarding
    /// to it again.
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Forwards every event to each inner observer, in order.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.observers.iter().for_each(|o| o.on_success(ctx, stats));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.observers.iter().for_each(|o| o.on_failure(ctx, severity, error));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.observers.iter().for_each(|o| o.on_alert(ctx, severity, error));
    }
}

/// Logs events through `tracing`: successes at info (warn when rows were skipped or the scan was
/// cut short), failures at warn, alerts at error.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        if stats.skipped_rows > 0 || stats.truncated {
            warn!(
                format = ?ctx.format,
                path = %ctx.path.display(),
                rows = stats.rows,
                skipped = stats.skipped_rows,
                mode = ?stats.mode,
                truncated = stats.truncated,
                "ingested with losses"
            );
        } else {
            info!(
                format = ?ctx.format,
                path = %ctx.path.display(),
                rows = stats.rows,
                mode = ?stats.mode,
                "ingested"
            );
        }
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        warn!(?severity, format = ?ctx.format, path = %ctx.path.display(), %error, "ingestion failed");
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        error!(?severity, format = ?ctx.format, path = %ctx.path.display(), %error, "ingestion alert");
    }
}

/// Appends one timestamped line per event to a log file, e.g.
///
/// ```text
/// 2024-05-01 06:00:12 ok format=Csv path=data/raw/sales_2024-05-01.csv rows=1200 skipped=3 mode=Full
/// 2024-05-01 06:00:13 fail severity=Error format=Json path=data/raw/weather_2024-05-01.json err=...
/// ```
///
/// Logging never fails ingestion: a log file that cannot be opened or written is ignored.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append(&self, status: &str, ctx: &IngestionContext, detail: fmt::Arguments<'_>) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(
                f,
                "{} {status} format={:?} path={} {detail}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                ctx.format,
                ctx.path.display(),
            );
        }
    }
}

impl IngestionObserver for FileObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.append(
            "ok",
            ctx,
            format_args!(
                "rows={} skipped={} mode={:?}{}",
                stats.rows,
                stats.skipped_rows,
                stats.mode,
                if stats.truncated { " truncated" } else { "" }
            ),
        );
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append(&format!("fail severity={severity:?}"), ctx, format_args!("err={error}"));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append(&format!("ALERT severity={severity:?}"), ctx, format_args!("err={error}"));
    }
}
