//! Delimited-text ingestion.
//!
//! [`DelimitedReader`] turns raw bytes of a known [`Dialect`] into text rows, skipping (and
//! counting) rows with the wrong number of fields or bytes the encoding rejects.
//! [`ingest_csv`] then either loads the whole file or streams it in chunks, depending on the file
//! size and [`IngestConfig`].

use std::borrow::Cow;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use csv::ByteRecord;
use encoding_rs::Encoding;
use tracing::{debug, info, warn};

use crate::config::{IngestConfig, SamplingStrategy};
use crate::error::{IngestionError, IngestionResult};
use crate::profile::{CorrelationMatrix, MissingCounter, category_counts};
use crate::sampling::Reservoir;
use crate::stats::ColumnAccumulator;
use crate::types::{DataSet, Schema, parse_finite_f64};

use super::dialect::Dialect;
use super::result::{IngestMode, IngestResult, LoadedTable, SourceInfo, digest_full_table};
use super::unified::IngestionFormat;

/// Row reader over delimited text with a header line.
pub struct DelimitedReader<R: Read> {
    inner: csv::Reader<R>,
    headers: Vec<String>,
    delimiter: u8,
    encoding: &'static Encoding,
    lossy: bool,
    record: ByteRecord,
    skipped_rows: usize,
}

impl DelimitedReader<File> {
    pub fn from_path(path: impl AsRef<Path>, dialect: &Dialect) -> IngestionResult<Self> {
        Self::from_reader(File::open(path)?, dialect)
    }

    /// Like [`Self::from_path`], but a header the dialect's encoding rejects is retried with each
    /// of `fallback` in order.
    pub fn from_path_with_fallback(
        path: impl AsRef<Path>,
        dialect: &Dialect,
        fallback: &[&'static Encoding],
    ) -> IngestionResult<Self> {
        Self::from_reader_with_fallback(File::open(path)?, dialect, fallback)
    }
}

impl<R: Read> DelimitedReader<R> {
    /// Wrap `rdr` and read the header record.
    ///
    /// The header must decode strictly with the dialect's encoding, even when the dialect is
    /// lossy: a file whose first line is undecodable is rejected as a whole.
    pub fn from_reader(rdr: R, dialect: &Dialect) -> IngestionResult<Self> {
        Self::from_reader_with_fallback(rdr, dialect, &[])
    }

    /// Wrap `rdr` and read the header record, trying the dialect's encoding first and then each
    /// of `fallback`. The first encoding that decodes the whole header is used for every row.
    ///
    /// The sniffed prefix can end before the first line does, so a later byte of the header may
    /// rule out the sniffed encoding.
    pub fn from_reader_with_fallback(
        rdr: R,
        dialect: &Dialect,
        fallback: &[&'static Encoding],
    ) -> IngestionResult<Self> {
        let mut inner = csv::ReaderBuilder::new()
            .delimiter(dialect.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(rdr);

        let mut record = ByteRecord::new();
        if !inner.read_byte_record(&mut record)? {
            return Err(IngestionError::MissingHeader);
        }

        let mut tried = std::iter::once(dialect.encoding).chain(fallback.iter().copied());
        let (encoding, raw_headers) = tried
            .find_map(|enc| decode_record_strict(enc, &record).map(|fields| (enc, fields)))
            .ok_or_else(|| IngestionError::Undecodable {
                encoding: dialect.encoding.name().to_string(),
            })?;
        if encoding != dialect.encoding {
            debug!(
                sniffed = dialect.encoding.name(),
                chosen = encoding.name(),
                "header rejected the sniffed encoding"
            );
        }

        Ok(Self {
            inner,
            headers: normalize_headers(raw_headers),
            delimiter: dialect.delimiter,
            encoding,
            lossy: dialect.lossy,
            record,
            skipped_rows: 0,
        })
    }

    /// Dialect rows are actually decoded with, after any header fallback.
    pub fn dialect(&self) -> Dialect {
        Dialect {
            delimiter: self.delimiter,
            encoding: self.encoding,
            lossy: self.lossy,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Malformed rows skipped so far.
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// Next well-formed row, or `None` at end of input. Only I/O failures are returned as errors.
    pub fn next_row(&mut self) -> IngestionResult<Option<Vec<String>>> {
        loop {
            match self.inner.read_byte_record(&mut self.record) {
                Ok(false) => return Ok(None),
                Ok(true) => {}
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    debug!(error = %e, "skipping unreadable row");
                    self.skipped_rows += 1;
                    continue;
                }
            }

            let line = self.record.position().map(|p| p.line()).unwrap_or_default();
            if self.record.len() != self.headers.len() {
                debug!(
                    line,
                    expected = self.headers.len(),
                    found = self.record.len(),
                    "skipping row with wrong field count"
                );
                self.skipped_rows += 1;
                continue;
            }

            let decoded = self
                .record
                .iter()
                .map(|field| {
                    if self.lossy {
                        Some(decode_lossy(self.encoding, field))
                    } else {
                        decode_strict(self.encoding, field)
                    }
                })
                .collect::<Option<Vec<_>>>();
            match decoded {
                Some(row) => return Ok(Some(row)),
                None => {
                    debug!(line, encoding = self.encoding.name(), "skipping undecodable row");
                    self.skipped_rows += 1;
                }
            }
        }
    }

    /// Whether any record is left, well-formed or not. Reads one raw record and counts nothing.
    pub fn has_more(&mut self) -> IngestionResult<bool> {
        match self.inner.read_byte_record(&mut self.record) {
            Ok(more) => Ok(more),
            Err(e) if e.is_io_error() => Err(e.into()),
            Err(_) => Ok(true),
        }
    }

    /// Up to `max_rows` well-formed rows; fewer only at end of input.
    pub fn next_batch(&mut self, max_rows: usize) -> IngestionResult<Vec<Vec<String>>> {
        let mut batch = Vec::with_capacity(max_rows.min(16_384));
        while batch.len() < max_rows {
            match self.next_row()? {
                Some(row) => batch.push(row),
                None => break,
            }
        }
        Ok(batch)
    }

    /// Read every remaining row.
    pub fn read_all(mut self) -> IngestionResult<LoadedTable> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row()? {
            rows.push(row);
        }
        Ok(LoadedTable {
            headers: self.headers,
            rows,
            skipped_rows: self.skipped_rows,
        })
    }
}

/// Ingest a delimited file of the given dialect.
///
/// - Files below `config.size_threshold_bytes` (or any file unless the strategy is
///   [`SamplingStrategy::StreamingReservoir`]) are loaded whole; `row_cap` may reduce the rows
///   used for statistics, while `row_count` stays the true number of data rows.
/// - Larger files are read in chunks of `chunk_row_count` rows; statistics are accumulated per
///   chunk, a fixed fraction of each chunk goes to the capped reservoir, and the chunk is then
///   dropped. Reading stops after `max_rows_scanned` rows.
///
/// Fails if the file cannot be opened, is empty, has no header, or its header is undecodable.
pub fn ingest_csv(
    path: impl AsRef<Path>,
    dialect: &Dialect,
    config: &IngestConfig,
) -> IngestionResult<IngestResult> {
    config.validate()?;
    let path = path.as_ref();
    let file_size_bytes = fs::metadata(path)?.len();
    if file_size_bytes == 0 {
        return Err(IngestionError::EmptyFile {
            path: path.to_path_buf(),
        });
    }

    let streaming = config.sampling_strategy == SamplingStrategy::StreamingReservoir
        && file_size_bytes >= config.size_threshold_bytes;
    info!(
        path = %path.display(),
        size_bytes = file_size_bytes,
        delimiter = %char::from(dialect.delimiter).escape_default(),
        encoding = dialect.encoding.name(),
        streaming,
        "ingesting delimited file"
    );

    let fallback = config.encoding_candidates()?;
    let reader = DelimitedReader::from_path_with_fallback(path, dialect, &fallback)?;
    let source = SourceInfo {
        path: path.to_path_buf(),
        format: IngestionFormat::Csv,
        dialect: Some(reader.dialect()),
        file_size_bytes,
    };

    let result = if streaming {
        ingest_streaming(reader, source, config)?
    } else {
        digest_full_table(reader.read_all()?, source, config)
    };

    if result.skipped_rows > 0 {
        warn!(path = %path.display(), skipped = result.skipped_rows, "malformed rows skipped");
    }
    if result.is_sample_degenerate() {
        warn!(path = %path.display(), "sample is empty, nothing to plot");
    }
    Ok(result)
}

fn ingest_streaming<R: Read>(
    mut reader: DelimitedReader<R>,
    source: SourceInfo,
    config: &IngestConfig,
) -> IngestionResult<IngestResult> {
    let next_size = |scanned: usize| match config.max_rows_scanned {
        Some(max) => config.chunk_row_count.min(max.saturating_sub(scanned)),
        None => config.chunk_row_count,
    };

    let headers = reader.headers().to_vec();
    let mut chunk = reader.next_batch(next_size(0))?;
    // Column types come from the first chunk; later cells that do not parse count as missing.
    let schema = Schema::infer(&headers, &chunk);
    let numeric: Vec<(usize, String)> = schema
        .numeric_fields()
        .map(|(idx, name)| (idx, name.to_string()))
        .collect();

    let mut accumulators = vec![ColumnAccumulator::new(); numeric.len()];
    let mut missing = MissingCounter::new(schema.fields.len());
    let mut reservoir = Reservoir::new(config.reservoir_cap, config.sampling_fraction, config.seed);
    let mut row_count = 0usize;
    let mut chunks = 0usize;
    let mut truncated = false;

    while !chunk.is_empty() {
        chunks += 1;
        row_count += chunk.len();
        for row in &chunk {
            missing.update_text(&schema, row);
            for ((idx, _), acc) in numeric.iter().zip(accumulators.iter_mut()) {
                acc.update(row.get(*idx).and_then(|cell| parse_finite_f64(cell.trim())));
            }
        }
        let drawn = reservoir.offer_chunk(&chunk);
        debug!(chunk = chunks, rows = chunk.len(), drawn, total = row_count, "chunk processed");

        let want = next_size(row_count);
        if want == 0 {
            truncated = reader.has_more()?;
            if truncated {
                info!(max_rows_scanned = row_count, "row limit reached, stopping scan");
            }
            break;
        }
        chunk = reader.next_batch(want)?;
    }

    let summaries = numeric
        .iter()
        .zip(&accumulators)
        .filter_map(|((_, name), acc)| acc.finish().map(|s| (name.clone(), s)))
        .collect();
    let sample = DataSet::from_text_rows(schema.clone(), &reservoir.into_rows());
    let categories = category_counts(&sample);
    let correlations = CorrelationMatrix::from_dataset(&sample);
    let missing = missing.finish(&schema);

    Ok(IngestResult {
        source: source.path,
        format: source.format,
        dialect: source.dialect,
        file_size_bytes: source.file_size_bytes,
        mode: IngestMode::Streamed,
        row_count,
        column_count: headers.len(),
        schema,
        numeric_column_names: numeric.into_iter().map(|(_, name)| name).collect(),
        summaries,
        missing,
        categories,
        correlations,
        skipped_rows: reader.skipped_rows(),
        truncated,
        sample_rows: sample.row_count(),
        sample,
    })
}

fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(Cow::into_owned)
}

fn decode_record_strict(encoding: &'static Encoding, record: &ByteRecord) -> Option<Vec<String>> {
    record.iter().map(|field| decode_strict(encoding, field)).collect()
}

fn decode_lossy(encoding: &'static Encoding, bytes: &[u8]) -> String {
    encoding.decode_without_bom_handling(bytes).0.into_owned()
}

/// Trim names, strip a leading BOM, name blank columns `column_{n}` and suffix duplicates with
/// `.1`, `.2`, ...
fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for (idx, name) in raw.into_iter().enumerate() {
        let name = name.trim_start_matches('\u{feff}').trim();
        let base = if name.is_empty() {
            format!("column_{}", idx + 1)
        } else {
            name.to_string()
        };

        let mut candidate = base.clone();
        let mut n = 0;
        while seen.contains(&candidate) {
            n += 1;
            candidate = format!("{base}.{n}");
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }
    out
}
