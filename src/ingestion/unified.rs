//! Unified ingestion entrypoint.
//!
//! Most callers should use [`ingest_from_path`], which digests a raw file into an
//! [`IngestResult`]:
//!
//! - If [`IngestionOptions::format`] is `None`, the format is inferred from the file extension.
//! - If [`IngestionOptions::dialect`] is `None`, CSV dialects are sniffed from the file prefix.
//! - If an [`super::observability::IngestionObserver`] is provided, success/failure/alerts are
//!   reported to it.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::config::IngestConfig;
use crate::error::{IngestionError, IngestionResult};

use super::dialect::guess_dialect_with;
use super::observability::{IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats};
use super::result::IngestResult;
use super::{csv, json};

/// Supported ingestion formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionFormat {
    /// Delimited text (comma, semicolon, tab or pipe).
    Csv,
    /// JSON object, array-of-objects or NDJSON.
    Json,
}

impl IngestionFormat {
    /// Parse an ingestion format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" | "tsv" | "txt" => Some(Self::Csv),
            "json" | "ndjson" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|s| s.to_str())
            .and_then(Self::from_extension)
    }
}

/// Options controlling unified ingestion behavior.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct IngestionOptions {
    /// If `None`, auto-detect format from file extension.
    pub format: Option<IngestionFormat>,
    /// If `None`, sniff delimiter and encoding from the first bytes of the file.
    pub dialect: Option<super::dialect::Dialect>,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for IngestionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionOptions")
            .field("format", &self.format)
            .field("dialect", &self.dialect)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            format: None,
            dialect: None,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

/// Unified ingestion entry point for path-based sources.
///
/// When an observer is configured, this function reports:
///
/// - `on_success` on success, with row and skipped-row counts, the mode and truncation
/// - `on_failure` on failure, with a computed severity
/// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
///
/// # Examples
///
/// ```no_run
/// use rust_data_digest::config::IngestConfig;
/// use rust_data_digest::ingestion::{ingest_from_path, IngestionOptions};
///
/// # fn main() -> Result<(), rust_data_digest::IngestionError> {
/// let res = ingest_from_path("sales.csv", &IngestConfig::default(), &IngestionOptions::default())?;
/// println!("rows={} numeric={:?}", res.row_count, res.numeric_column_names);
/// # Ok(())
/// # }
/// ```
///
/// ## Observability (tracing + alert threshold)
///
/// ```no_run
/// use std::sync::Arc;
///
/// use rust_data_digest::config::IngestConfig;
/// use rust_data_digest::ingestion::{
///     ingest_from_path, IngestionOptions, IngestionSeverity, TracingObserver,
/// };
///
/// let opts = IngestionOptions {
///     observer: Some(Arc::new(TracingObserver)),
///     alert_at_or_above: IngestionSeverity::Critical,
///     ..Default::default()
/// };
///
/// // Missing files are treated as Critical and will trigger `on_alert` at this threshold.
/// let _err = ingest_from_path("does_not_exist.csv", &IngestConfig::default(), &opts).unwrap_err();
/// ```
pub fn ingest_from_path(
    path: impl AsRef<Path>,
    config: &IngestConfig,
    options: &IngestionOptions,
) -> IngestionResult<IngestResult> {
    let path = path.as_ref();
    let fmt = match options.format {
        Some(f) => f,
        None => infer_format_from_path(path)?,
    };

    let ctx = IngestionContext {
        path: path.to_path_buf(),
        format: fmt,
    };

    let result = match fmt {
        IngestionFormat::Csv => ingest_delimited(path, config, options),
        IngestionFormat::Json => json::ingest_json(path, config),
    };

    if let Some(obs) = options.observer.as_ref() {
        match &result {
            Ok(res) => obs.on_success(&ctx, IngestionStats::from_result(res)),
            Err(e) => {
                let sev = severity_for_error(e);
                obs.on_failure(&ctx, sev, e);
                if sev >= options.alert_at_or_above {
                    obs.on_alert(&ctx, sev, e);
                }
            }
        }
    }

    result
}

fn ingest_delimited(
    path: &Path,
    config: &IngestConfig,
    options: &IngestionOptions,
) -> IngestionResult<IngestResult> {
    let dialect = match options.dialect {
        Some(d) => d,
        None => guess_dialect_with(
            path,
            config.dialect_prefix_bytes,
            &config.encoding_candidates()?,
        )?,
    };
    csv::ingest_csv(path, &dialect, config)
}

/// Classify an ingestion error. I/O and configuration problems are `Critical`; anything about
/// the content of one file is an `Error`.
pub fn severity_for_error(e: &IngestionError) -> IngestionSeverity {
    match e {
        IngestionError::Io(_) => IngestionSeverity::Critical,
        IngestionError::InvalidConfig { .. } => IngestionSeverity::Critical,
        IngestionError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => IngestionSeverity::Critical,
            _ => IngestionSeverity::Error,
        },
        IngestionError::Json(err) if err.is_io() => IngestionSeverity::Critical,
        IngestionError::Json(_)
        | IngestionError::EmptyFile { .. }
        | IngestionError::MissingHeader
        | IngestionError::Undecodable { .. }
        | IngestionError::UnsupportedFormat { .. } => IngestionSeverity::Error,
    }
}

fn infer_format_from_path(path: &Path) -> IngestionResult<IngestionFormat> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| IngestionError::UnsupportedFormat {
            message: format!(
                "cannot infer format: path has no extension ({})",
                path.display()
            ),
        })?;

    IngestionFormat::from_extension(ext).ok_or_else(|| IngestionError::UnsupportedFormat {
        message: format!(
            "cannot infer format from extension '{ext}' for path ({})",
            path.display()
        ),
    })
}
