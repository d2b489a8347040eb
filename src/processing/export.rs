use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::error::IngestionResult;
use crate::ingestion::IngestResult;
use crate::ingestion::json::JsonShape;
use crate::types::DataSet;

#[derive(Serialize)]
struct StatsRow<'a> {
    column: &'a str,
    count: u64,
    missing: u64,
    mean: f64,
    std: f64,
    variance: f64,
    min: f64,
    max: f64,
    q25: Option<f64>,
    median: Option<f64>,
    q75: Option<f64>,
}

/// Write the numeric column summaries of `result`, in column order.
///
/// Numeric columns without a single valid value are listed with a zero count and empty figures.
pub fn write_stats_csv(result: &IngestResult, path: impl AsRef<Path>) -> IngestionResult<()> {
    // The header is written by hand so that it is present even without numeric columns.
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    wtr.write_record([
        "column", "count", "missing", "mean", "std", "variance", "min", "max", "q25", "median", "q75",
    ])?;
    for name in &result.numeric_column_names {
        match result.summary(name) {
            Some(s) => wtr.serialize(StatsRow {
                column: name,
                count: s.count,
                missing: s.missing,
                mean: s.mean,
                std: s.std,
                variance: s.variance,
                min: s.min,
                max: s.max,
                q25: s.quartiles.map(|q| q.q25),
                median: s.quartiles.map(|q| q.median),
                q75: s.quartiles.map(|q| q.q75),
            })?,
            None => wtr.write_record([name.as_str(), "0", "", "", "", "", "", "", "", "", ""])?,
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Write `sample` as comma-delimited UTF-8 with a header row. Nulls are empty cells.
pub fn write_sample_csv(sample: &DataSet, path: impl AsRef<Path>) -> IngestionResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(sample.schema.field_names())?;
    for row in &sample.rows {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json_structure(shape: &JsonShape, path: impl AsRef<Path>) -> IngestionResult<()> {
    let out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(out, shape)?;
    Ok(())
}
