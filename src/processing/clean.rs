//! Deduplicated rewrite of a raw source.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::IngestionResult;
use crate::ingestion::IngestionFormat;
use crate::ingestion::csv::DelimitedReader;
use crate::ingestion::dialect::Dialect;
use crate::ingestion::json::read_json_table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CleanSummary {
    pub rows_written: usize,
    pub duplicates_dropped: usize,
    pub skipped_rows: usize,
}

/// Rewrite every well-formed row of `source` as comma-delimited UTF-8, dropping exact
/// duplicate rows (first occurrence kept).
///
/// Delimited sources are re-read with `dialect`; JSON sources are flattened the same way as
/// during ingestion. The whole set of distinct rows is held in memory, so callers only do this
/// for sources small enough to load whole.
pub fn write_clean_csv(
    source: impl AsRef<Path>,
    format: IngestionFormat,
    dialect: &Dialect,
    out: impl AsRef<Path>,
) -> IngestionResult<CleanSummary> {
    let source = source.as_ref();
    let mut wtr = csv::Writer::from_path(out)?;
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut summary = CleanSummary::default();

    let mut emit = |row: Vec<String>, wtr: &mut csv::Writer<std::fs::File>| -> IngestionResult<()> {
        if seen.contains(&row) {
            summary.duplicates_dropped += 1;
            return Ok(());
        }
        wtr.write_record(&row)?;
        seen.insert(row);
        summary.rows_written += 1;
        Ok(())
    };

    match format {
        IngestionFormat::Csv => {
            let mut rdr = DelimitedReader::from_path(source, dialect)?;
            wtr.write_record(rdr.headers())?;
            while let Some(row) = rdr.next_row()? {
                emit(row, &mut wtr)?;
            }
            summary.skipped_rows = rdr.skipped_rows();
        }
        IngestionFormat::Json => {
            let table = read_json_table(source)?;
            wtr.write_record(&table.headers)?;
            for row in table.rows {
                emit(row, &mut wtr)?;
            }
            summary.skipped_rows = table.skipped_rows;
        }
    }
    wtr.flush()?;

    debug!(
        path = %source.display(),
        rows = summary.rows_written,
        duplicates = summary.duplicates_dropped,
        "clean copy written"
    );
    Ok(summary)
}
