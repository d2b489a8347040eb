//! [`IngestResult`] and the full-load digest shared by CSV and JSON ingestion.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::config::{IngestConfig, SamplingStrategy};
use crate::profile::{CategoryCounts, ColumnMissing, CorrelationMatrix, category_counts, missing_counts};
use crate::sampling::sample_exact;
use crate::stats::{ColumnAccumulator, ColumnSummary, Quartiles};
use crate::types::{DataSet, Schema};

use super::dialect::Dialect;
use super::unified::IngestionFormat;

/// How a source ended up being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    /// Every row loaded; statistics cover every row.
    Full,
    /// Every row loaded, then `row_cap` applied; statistics cover the random subset.
    Sampled,
    /// Read in chunks; statistics accumulated on the fly, sample drawn per chunk.
    Streamed,
}

/// Outcome of ingesting one source. Built once and never modified; re-ingesting produces a new
/// value.
#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    pub source: PathBuf,
    pub format: IngestionFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialect: Option<Dialect>,
    pub file_size_bytes: u64,
    pub mode: IngestMode,
    /// Valid data rows (header excluded). On the streaming path, rows actually scanned.
    pub row_count: usize,
    pub column_count: usize,
    pub schema: Schema,
    pub numeric_column_names: Vec<String>,
    pub summaries: BTreeMap<String, ColumnSummary>,
    /// Missing cells of every column, in schema order.
    pub missing: Vec<ColumnMissing>,
    /// Most frequent values of text columns: over the effective table on full loads, over the
    /// sample when streamed.
    pub categories: Vec<CategoryCounts>,
    /// Pearson correlations between numeric columns of the sample.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlations: Option<CorrelationMatrix>,
    /// Rows dropped because they were malformed (wrong column count, undecodable bytes).
    pub skipped_rows: usize,
    /// Streaming stopped at `max_rows_scanned` with rows left in the file.
    pub truncated: bool,
    pub sample_rows: usize,
    /// Bounded sample for plots: at most `reservoir_cap` rows, never more than `row_count`.
    #[serde(skip)]
    pub sample: DataSet,
}

impl IngestResult {
    /// No rows to plot. Downstream renderers treat this as "nothing to plot".
    pub fn is_sample_degenerate(&self) -> bool {
        self.sample.is_empty()
    }

    pub fn summary(&self, column: &str) -> Option<&ColumnSummary> {
        self.summaries.get(column)
    }
}

/// Where a table came from, carried into the result.
#[derive(Debug, Clone)]
pub(crate) struct SourceInfo {
    pub path: PathBuf,
    pub format: IngestionFormat,
    pub dialect: Option<Dialect>,
    pub file_size_bytes: u64,
}

/// Text table fully read into memory.
#[derive(Debug, Clone, Default)]
pub struct LoadedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub skipped_rows: usize,
}

/// Full-load path: optional row cap, schema inference, exact statistics, bounded sample.
pub(crate) fn digest_full_table(
    table: LoadedTable,
    source: SourceInfo,
    config: &IngestConfig,
) -> IngestResult {
    let LoadedTable {
        headers,
        rows,
        skipped_rows,
    } = table;
    let row_count = rows.len();

    let row_cap = match config.sampling_strategy {
        SamplingStrategy::None => None,
        _ => config.row_cap,
    };
    let (effective, mode) = match row_cap {
        Some(cap) if row_count > cap => {
            debug!(row_count, row_cap = cap, "row cap exceeded, sampling");
            (sample_exact(rows, cap, config.seed), IngestMode::Sampled)
        }
        _ => (rows, IngestMode::Full),
    };

    let schema = Schema::infer(&headers, &effective);
    let table = DataSet::from_text_rows(schema.clone(), &effective);
    drop(effective);

    let mut numeric_column_names = Vec::new();
    let mut summaries = BTreeMap::new();
    for (idx, name) in schema.numeric_fields() {
        let mut acc = ColumnAccumulator::new();
        for row in &table.rows {
            acc.update(row.get(idx).and_then(|v| v.as_f64()));
        }
        numeric_column_names.push(name.to_string());
        if let Some(mut summary) = acc.finish() {
            summary.quartiles = Quartiles::from_values(&table.numeric_column(idx));
            summaries.insert(name.to_string(), summary);
        }
    }

    let missing = missing_counts(&table);
    let categories = category_counts(&table);
    let sample = bound_sample(table, config);
    let correlations = CorrelationMatrix::from_dataset(&sample);
    IngestResult {
        source: source.path,
        format: source.format,
        dialect: source.dialect,
        file_size_bytes: source.file_size_bytes,
        mode,
        row_count,
        column_count: headers.len(),
        schema,
        numeric_column_names,
        summaries,
        missing,
        categories,
        correlations,
        skipped_rows,
        truncated: false,
        sample_rows: sample.row_count(),
        sample,
    }
}

fn bound_sample(table: DataSet, config: &IngestConfig) -> DataSet {
    let cap = config.reservoir_cap;
    if table.row_count() <= cap {
        return table;
    }
    let DataSet { schema, mut rows } = table;
    let rows = match config.sampling_strategy {
        SamplingStrategy::None => {
            rows.truncate(cap);
            rows
        }
        _ => sample_exact(rows, cap, config.seed),
    };
    DataSet::new(schema, rows)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{IngestMode, LoadedTable, SourceInfo, digest_full_table};
    use crate::config::{IngestConfig, SamplingStrategy};
    use crate::ingestion::IngestionFormat;

    fn table(n: usize) -> LoadedTable {
        LoadedTable {
            headers: vec!["id".to_string(), "label".to_string()],
            rows: (0..n).map(|i| vec![i.to_string(), format!("row{i}")]).collect(),
            skipped_rows: 0,
        }
    }

    fn source() -> SourceInfo {
        SourceInfo {
            path: PathBuf::from("mem.csv"),
            format: IngestionFormat::Csv,
            dialect: None,
            file_size_bytes: 0,
        }
    }

    #[test]
    fn row_cap_samples_but_reports_true_row_count() {
        let cfg = IngestConfig {
            row_cap: Some(10),
            ..Default::default()
        };
        let res = digest_full_table(table(100), source(), &cfg);
        assert_eq!(res.mode, IngestMode::Sampled);
        assert_eq!(res.row_count, 100);
        assert_eq!(res.summary("id").unwrap().count, 10);
        assert_eq!(res.numeric_column_names, vec!["id".to_string()]);
    }

    #[test]
    fn strategy_none_ignores_row_cap_and_keeps_head_as_sample() {
        let cfg = IngestConfig {
            row_cap: Some(10),
            reservoir_cap: 5,
            sampling_strategy: SamplingStrategy::None,
            ..Default::default()
        };
        let res = digest_full_table(table(100), source(), &cfg);
        assert_eq!(res.mode, IngestMode::Full);
        assert_eq!(res.summary("id").unwrap().count, 100);
        assert_eq!(res.sample_rows, 5);
        assert_eq!(res.sample.numeric_column(0), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn full_load_profiles_every_column() {
        let mut t = table(4);
        t.rows[1][1] = String::new();
        t.rows[2][1] = "row0".to_string();
        let res = digest_full_table(t, source(), &IngestConfig::default());
        assert_eq!(res.missing.len(), 2);
        assert_eq!(res.missing[1].missing, 1);
        assert_eq!(res.missing[1].percent, 25.0);
        assert_eq!(res.categories[0].top[0].value, "row0");
        assert_eq!(res.categories[0].top[0].count, 2);
        assert!(res.correlations.is_none());
    }

    #[test]
    fn full_load_computes_quartiles() {
        let res = digest_full_table(table(5), source(), &IngestConfig::default());
        let q = res.summary("id").unwrap().quartiles.unwrap();
        assert_eq!(q.median, 2.0);
    }
}
