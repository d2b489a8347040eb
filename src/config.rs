//! Run configuration.
//!
//! A [`PipelineConfig`] is built once per run (from defaults, an optional JSON file and CLI
//! overrides) and passed by reference to every stage. Nothing in the crate reads directories or
//! tuning knobs from global state.

use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, IngestionResult};

/// How rows are sampled while ingesting a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingStrategy {
    /// Always load the whole file, never sample. The retained sample is the head of the table.
    None,
    /// Always load the whole file, then apply `row_cap` as an exact-size random sample.
    RandomN,
    /// Load small files whole (with `row_cap`); stream files at or above `size_threshold_bytes`.
    #[default]
    StreamingReservoir,
}

/// Tuning knobs consumed by ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Files at or above this size are streamed in chunks instead of loaded whole.
    pub size_threshold_bytes: u64,
    /// Maximum rows kept for statistics on a full load; larger tables are randomly sampled.
    pub row_cap: Option<usize>,
    /// Rows per chunk on the streaming path.
    pub chunk_row_count: usize,
    /// Upper bound on the retained sample, on every path.
    pub reservoir_cap: usize,
    /// Fraction of each chunk drawn into the reservoir on the streaming path.
    pub sampling_fraction: f64,
    /// Streaming stops once this many valid rows have been scanned.
    pub max_rows_scanned: Option<usize>,
    pub sampling_strategy: SamplingStrategy,
    /// Seed for every random draw, so reruns pick the same rows.
    pub seed: u64,
    /// Bytes read from the head of the file to guess its dialect.
    pub dialect_prefix_bytes: usize,
    /// Encoding labels tried in order (WHATWG labels, e.g. `utf-8`, `latin1`).
    pub encodings: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            size_threshold_bytes: 1_000 * 1024 * 1024,
            row_cap: Some(1_000_000),
            chunk_row_count: 100_000,
            reservoir_cap: 50_000,
            sampling_fraction: 0.01,
            max_rows_scanned: Some(1_000_000),
            sampling_strategy: SamplingStrategy::default(),
            seed: 42,
            dialect_prefix_bytes: 1000,
            encodings: ["utf-8", "latin1", "iso-8859-1", "windows-1252"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

impl IngestConfig {
    /// Check that every knob is in range.
    pub fn validate(&self) -> IngestionResult<()> {
        if self.chunk_row_count == 0 {
            return Err(invalid("chunk_row_count must be > 0"));
        }
        if self.reservoir_cap == 0 {
            return Err(invalid("reservoir_cap must be > 0"));
        }
        if self.max_rows_scanned == Some(0) || self.row_cap == Some(0) {
            return Err(invalid("max_rows_scanned and row_cap must be > 0 when set"));
        }
        if !(0.0..=1.0).contains(&self.sampling_fraction) {
            return Err(invalid(format!(
                "sampling_fraction must be within [0, 1], got {}",
                self.sampling_fraction
            )));
        }
        if self.dialect_prefix_bytes == 0 {
            return Err(invalid("dialect_prefix_bytes must be > 0"));
        }
        self.encoding_candidates().map(|_| ())
    }

    /// Resolve [`Self::encodings`] to encodings, in order.
    pub fn encoding_candidates(&self) -> IngestionResult<Vec<&'static Encoding>> {
        if self.encodings.is_empty() {
            return Err(invalid("at least one encoding label is required"));
        }
        self.encodings
            .iter()
            .map(|label| {
                Encoding::for_label(label.trim().as_bytes())
                    .ok_or_else(|| invalid(format!("unknown encoding label '{label}'")))
            })
            .collect()
    }
}

/// Per-run configuration: directory layout plus ingestion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Where downloaded raw files land.
    pub raw_dir: PathBuf,
    /// Where cleaned/derived files are written.
    pub processed_dir: PathBuf,
    /// Where the run reports are written.
    pub report_dir: PathBuf,
    #[serde(default)]
    pub ingest: IngestConfig,
    /// Discord webhook notified at the end of a run, if set.
    #[serde(default)]
    pub discord_webhook: Option<String>,
}

impl PipelineConfig {
    /// Conventional layout under `base`: `data/raw`, `data/processed`, `data/reports`.
    pub fn new(base: impl AsRef<Path>) -> Self {
        let data = base.as_ref().join("data");
        Self {
            raw_dir: data.join("raw"),
            processed_dir: data.join("processed"),
            report_dir: data.join("reports"),
            ingest: IngestConfig::default(),
            discord_webhook: None,
        }
    }

    /// Load a configuration from a JSON file.
    ///
    /// The three directories are required; `ingest` fields fall back to their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> IngestionResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> IngestionResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.ingest.validate()?;
        Ok(config)
    }
}

fn invalid(message: impl Into<String>) -> IngestionError {
    IngestionError::InvalidConfig {
        message: message.into(),
    }
}
