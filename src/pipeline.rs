//! Batch run over every source discovered for a date.
//!
//! One bad file never aborts the batch: each discovered source yields exactly one
//! [`FileReport`], either `ingested` (with the paths written) or `failed` (with the error text and
//! its [`IngestionSeverity`]).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::discovery::{RawSource, discover_sources};
use crate::error::IngestionResult;
use crate::ingestion::json::read_json_table;
use crate::ingestion::{
    IngestResult, IngestionFormat, IngestionObserver, IngestionOptions, IngestionSeverity,
    ingest_from_path, severity_for_error,
};
use crate::processing::{write_clean_csv, write_json_structure, write_sample_csv, write_stats_csv};

/// Outcome of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Local>,
    pub run_date: NaiveDate,
    pub files: Vec<FileReport>,
}

impl BatchReport {
    pub fn ingested(&self) -> impl Iterator<Item = (&FileReport, &IngestResult)> {
        self.files.iter().filter_map(|f| match &f.outcome {
            FileOutcome::Ingested { result, .. } => Some((f, result)),
            FileOutcome::Failed { .. } => None,
        })
    }

    pub fn ingested_count(&self) -> usize {
        self.ingested().count()
    }

    pub fn failed_count(&self) -> usize {
        self.files.len() - self.ingested_count()
    }

    pub fn total_rows(&self) -> usize {
        self.ingested().map(|(_, r)| r.row_count).sum()
    }
}

/// One entry per discovered source.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub name: String,
    pub path: PathBuf,
    pub format: IngestionFormat,
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Ingested {
        result: IngestResult,
        output_files: Vec<PathBuf>,
    },
    Failed {
        error: String,
        severity: IngestionSeverity,
    },
}

/// Discover the sources of `date`, ingest them in order and write their processed outputs.
///
/// Creates `processed_dir` and `report_dir` if needed. Fails only if those directories cannot be
/// created or `raw_dir` cannot be listed; per-file problems end up in the report.
pub fn run_batch(
    config: &PipelineConfig,
    date: NaiveDate,
    observer: Option<Arc<dyn IngestionObserver>>,
) -> IngestionResult<BatchReport> {
    config.ingest.validate()?;
    fs::create_dir_all(&config.processed_dir)?;
    fs::create_dir_all(&config.report_dir)?;

    let sources = discover_sources(&config.raw_dir, date)?;
    if sources.is_empty() {
        warn!(raw_dir = %config.raw_dir.display(), %date, "no sources found");
    }

    let options = IngestionOptions {
        observer,
        ..Default::default()
    };

    let mut files = Vec::with_capacity(sources.len());
    for source in sources {
        let started = Instant::now();
        let outcome = match process_source(&source, config, &options) {
            Ok((result, output_files)) => FileOutcome::Ingested {
                result,
                output_files,
            },
            Err(e) => {
                let severity = severity_for_error(&e);
                warn!(source = %source.name, ?severity, error = %e, "source failed");
                FileOutcome::Failed {
                    error: e.to_string(),
                    severity,
                }
            }
        };
        files.push(FileReport {
            name: source.name,
            path: source.path,
            format: source.format,
            elapsed_ms: started.elapsed().as_millis() as u64,
            outcome,
        });
    }

    let report = BatchReport {
        generated_at: Local::now(),
        run_date: date,
        files,
    };
    info!(
        files = report.files.len(),
        ingested = report.ingested_count(),
        failed = report.failed_count(),
        "batch finished"
    );
    Ok(report)
}

fn process_source(
    source: &RawSource,
    config: &PipelineConfig,
    options: &IngestionOptions,
) -> IngestionResult<(IngestResult, Vec<PathBuf>)> {
    let options = IngestionOptions {
        format: Some(source.format),
        ..options.clone()
    };
    let result = ingest_from_path(&source.path, &config.ingest, &options)?;
    let outputs = write_outputs(source, &result, config)?;
    Ok((result, outputs))
}

fn write_outputs(
    source: &RawSource,
    result: &IngestResult,
    config: &PipelineConfig,
) -> IngestionResult<Vec<PathBuf>> {
    let out = |suffix: &str| -> PathBuf { output_path(&config.processed_dir, &source.name, suffix) };
    let mut written = Vec::new();

    let stats = out("stats.csv");
    write_stats_csv(result, &stats)?;
    written.push(stats);

    let sample = out("sample.csv");
    write_sample_csv(&result.sample, &sample)?;
    written.push(sample);

    if result.file_size_bytes < config.ingest.size_threshold_bytes {
        let clean = out("clean.csv");
        let dialect = result.dialect.unwrap_or_default();
        write_clean_csv(&source.path, source.format, &dialect, &clean)?;
        written.push(clean);
    }

    if source.format == IngestionFormat::Json {
        let structure = out("structure.json");
        let table = read_json_table(&source.path)?;
        write_json_structure(&table.shape, &structure)?;
        written.push(structure);
    }

    Ok(written)
}

fn output_path(dir: &Path, name: &str, suffix: &str) -> PathBuf {
    dir.join(format!("{name}_{suffix}"))
}
