use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use rust_data_digest::IngestionError;
use rust_data_digest::config::{IngestConfig, SamplingStrategy};
use rust_data_digest::ingestion::csv::ingest_csv;
use rust_data_digest::ingestion::{Dialect, IngestMode, IngestionOptions, guess_dialect, ingest_from_path};
use rust_data_digest::types::{DataType, Value};

fn tmp_file(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("rust-data-digest-{name}-{nanos}.csv"))
}

/// `rows` data rows of `id,value,label` where `value` is a deterministic float.
fn write_numeric_csv(name: &str, rows: usize) -> PathBuf {
    let mut text = String::from("id,value,label\n");
    for i in 0..rows {
        let value = (i as f64) * 0.5 + ((i * 7919) % 13) as f64;
        let _ = writeln!(text, "{i},{value},row{i}");
    }
    let path = tmp_file(name);
    fs::write(&path, text).unwrap();
    path
}

fn streaming_config() -> IngestConfig {
    IngestConfig {
        size_threshold_bytes: 0,
        chunk_row_count: 1_000,
        max_rows_scanned: None,
        ..Default::default()
    }
}

#[test]
fn small_file_row_count_is_exact() {
    let res = ingest_from_path(
        "tests/fixtures/people.csv",
        &IngestConfig::default(),
        &IngestionOptions::default(),
    )
    .unwrap();

    assert_eq!(res.mode, IngestMode::Full);
    assert_eq!(res.row_count, 3);
    assert_eq!(res.column_count, 4);
    assert_eq!(res.numeric_column_names, vec!["id", "score"]);
    assert_eq!(res.schema.fields[3].data_type, DataType::Bool);

    let score = res.summary("score").unwrap();
    assert_eq!(score.count, 2);
    assert_eq!(score.missing, 1);
    assert!((score.mean - 92.75).abs() < 1e-12);
    assert_eq!(res.sample_rows, 3);
}

#[test]
fn malformed_row_is_skipped_not_fatal() {
    let res = ingest_from_path(
        "tests/fixtures/malformed.csv",
        &IngestConfig::default(),
        &IngestionOptions::default(),
    )
    .unwrap();
    assert_eq!(res.row_count, 3);
    assert_eq!(res.skipped_rows, 1);
}

#[test]
fn malformed_row_is_skipped_when_streaming() {
    let res = ingest_csv("tests/fixtures/malformed.csv", &Dialect::default(), &streaming_config()).unwrap();
    assert_eq!(res.mode, IngestMode::Streamed);
    assert_eq!(res.row_count, 3);
    assert_eq!(res.skipped_rows, 1);
}

#[test]
fn latin1_byte_past_the_sniffed_prefix_switches_encoding() {
    let mut header = (0..200).map(|i| format!("col{i}")).collect::<Vec<_>>().join(",");
    header.push(',');
    let mut bytes = header.into_bytes();
    bytes.extend_from_slice(b"caf\xe9\n");
    assert!(bytes.len() > IngestConfig::default().dialect_prefix_bytes);
    let row = (0..201).map(|i| i.to_string()).collect::<Vec<_>>().join(",");
    bytes.extend_from_slice(row.as_bytes());
    bytes.push(b'\n');

    let path = tmp_file("long-latin1-header");
    fs::write(&path, bytes).unwrap();

    let res = ingest_from_path(&path, &IngestConfig::default(), &IngestionOptions::default()).unwrap();
    assert_eq!(res.dialect.unwrap().encoding.name(), "windows-1252");
    assert_eq!(res.column_count, 201);
    assert_eq!(res.schema.fields[200].name, "café");
    assert_eq!(res.row_count, 1);
}

#[test]
fn body_no_candidate_decodes_is_read_lossily() {
    let path = tmp_file("lossy-body");
    fs::write(&path, b"name,qty\ncaf\xe9,1\nok,2\n").unwrap();
    let cfg = IngestConfig {
        encodings: vec!["utf-8".to_string()],
        ..Default::default()
    };

    let res = ingest_from_path(&path, &cfg, &IngestionOptions::default()).unwrap();
    assert!(res.dialect.unwrap().lossy);
    assert_eq!(res.row_count, 2);
    assert_eq!(res.skipped_rows, 0);
    assert_eq!(res.sample.rows[0][0], Value::Utf8("caf\u{fffd}".to_string()));
}

#[test]
fn rows_past_the_scan_limit_are_not_counted_as_skipped() {
    let path = tmp_file("limit-then-malformed");
    fs::write(&path, "a,b\n1,2\n3,4\nbad\nbad\nbad\n").unwrap();
    let cfg = IngestConfig {
        max_rows_scanned: Some(2),
        ..streaming_config()
    };

    let res = ingest_csv(&path, &Dialect::default(), &cfg).unwrap();
    assert_eq!(res.row_count, 2);
    assert!(res.truncated);
    assert_eq!(res.skipped_rows, 0);
}

#[test]
fn latin1_semicolon_file_is_sniffed() {
    let d = guess_dialect("tests/fixtures/prices_latin1.csv").unwrap();
    assert_eq!(d.delimiter, b';');
    assert_eq!(d.encoding.name(), "windows-1252");
    assert!(!d.lossy);

    let res = ingest_from_path(
        "tests/fixtures/prices_latin1.csv",
        &IngestConfig::default(),
        &IngestionOptions::default(),
    )
    .unwrap();
    assert_eq!(res.schema.fields[0].name, "café");
    assert_eq!(res.numeric_column_names, vec!["quantité"]);
    assert_eq!(res.row_count, 2);
}

#[test]
fn empty_file_is_an_error() {
    let path = tmp_file("empty");
    fs::write(&path, "").unwrap();

    let err = ingest_from_path(&path, &IngestConfig::default(), &IngestionOptions::default())
        .unwrap_err();
    assert!(matches!(err, IngestionError::EmptyFile { .. }));

    let err = ingest_csv(&path, &Dialect::default(), &IngestConfig::default()).unwrap_err();
    assert!(matches!(err, IngestionError::EmptyFile { .. }));
}

#[test]
fn header_only_file_has_degenerate_sample() {
    let path = tmp_file("header-only");
    fs::write(&path, "a,b\n").unwrap();
    let res = ingest_csv(&path, &Dialect::default(), &IngestConfig::default()).unwrap();
    assert_eq!(res.row_count, 0);
    assert!(res.is_sample_degenerate());
}

#[test]
fn streaming_mean_matches_full_load_mean() {
    let path = write_numeric_csv("stream-vs-full", 10_000);
    let dialect = Dialect::default();

    let full = ingest_csv(&path, &dialect, &IngestConfig::default()).unwrap();
    let streamed = ingest_csv(&path, &dialect, &streaming_config()).unwrap();

    assert_eq!(full.mode, IngestMode::Full);
    assert_eq!(streamed.mode, IngestMode::Streamed);
    assert_eq!(streamed.row_count, full.row_count);

    let f = full.summary("value").unwrap();
    let s = streamed.summary("value").unwrap();
    assert!((f.mean - s.mean).abs() <= 1e-9 * f.mean.abs().max(1.0));
    assert!((f.variance - s.variance).abs() <= 1e-6 * f.variance.max(1.0));
    assert!(s.count as usize <= streamed.row_count);
    assert!(s.min <= s.mean && s.mean <= s.max);
    assert!(s.quartiles.is_none());
    assert!(f.quartiles.is_some());
}

#[test]
fn streaming_stops_at_max_rows_scanned() {
    let path = write_numeric_csv("max-rows", 5_000);
    let cfg = IngestConfig {
        max_rows_scanned: Some(2_500),
        ..streaming_config()
    };
    let res = ingest_csv(&path, &Dialect::default(), &cfg).unwrap();
    assert_eq!(res.row_count, 2_500);
    assert!(res.truncated);
    assert_eq!(res.summary("id").unwrap().max, 2_499.0);
}

#[test]
fn streaming_limit_equal_to_file_length_is_not_truncated() {
    let path = write_numeric_csv("max-rows-exact", 2_000);
    let cfg = IngestConfig {
        max_rows_scanned: Some(2_000),
        ..streaming_config()
    };
    let res = ingest_csv(&path, &Dialect::default(), &cfg).unwrap();
    assert_eq!(res.row_count, 2_000);
    assert!(!res.truncated);
}

#[test]
fn reservoir_never_exceeds_cap() {
    let path = write_numeric_csv("reservoir-cap", 5_000);
    let cfg = IngestConfig {
        sampling_fraction: 1.0,
        reservoir_cap: 100,
        ..streaming_config()
    };
    let res = ingest_csv(&path, &Dialect::default(), &cfg).unwrap();
    assert_eq!(res.sample_rows, 100);
    assert!(res.sample_rows <= res.row_count);
}

#[test]
fn fraction_sampling_draws_per_chunk() {
    let path = write_numeric_csv("reservoir-fraction", 5_000);
    let cfg = IngestConfig {
        sampling_fraction: 0.01,
        ..streaming_config()
    };
    let res = ingest_csv(&path, &Dialect::default(), &cfg).unwrap();
    assert_eq!(res.sample_rows, 50);
}

#[test]
fn row_cap_samples_full_loads_but_keeps_true_row_count() {
    let path = write_numeric_csv("row-cap", 1_000);
    let cfg = IngestConfig {
        row_cap: Some(100),
        sampling_strategy: SamplingStrategy::RandomN,
        ..Default::default()
    };
    let res = ingest_csv(&path, &Dialect::default(), &cfg).unwrap();
    assert_eq!(res.mode, IngestMode::Sampled);
    assert_eq!(res.row_count, 1_000);
    assert_eq!(res.summary("value").unwrap().count, 100);
}

#[test]
fn random_n_never_streams() {
    let path = write_numeric_csv("random-n", 500);
    let cfg = IngestConfig {
        size_threshold_bytes: 0,
        sampling_strategy: SamplingStrategy::RandomN,
        ..Default::default()
    };
    let res = ingest_csv(&path, &Dialect::default(), &cfg).unwrap();
    assert_eq!(res.mode, IngestMode::Full);
}

#[test]
fn variance_stays_non_negative_for_large_nearly_equal_values() {
    let mut text = String::from("x\n");
    for i in 0..3_000 {
        let _ = writeln!(text, "{}", 1.0e9 + (i % 3) as f64 * 1e-7);
    }
    let path = tmp_file("adversarial");
    fs::write(&path, text).unwrap();

    let res = ingest_csv(&path, &Dialect::default(), &streaming_config()).unwrap();
    let s = res.summary("x").unwrap();
    assert!(s.variance >= 0.0);
    assert!(s.std.is_finite());
    assert!(s.min <= s.mean && s.mean <= s.max);
}

#[test]
fn invalid_config_is_rejected() {
    let cfg = IngestConfig {
        chunk_row_count: 0,
        ..Default::default()
    };
    let err = ingest_csv("tests/fixtures/people.csv", &Dialect::default(), &cfg).unwrap_err();
    assert!(matches!(err, IngestionError::InvalidConfig { .. }));
}
