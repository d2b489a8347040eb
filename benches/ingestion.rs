use std::fmt::Write as _;
use std::path::PathBuf;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use encoding_rs::UTF_8;

use rust_data_digest::config::IngestConfig;
use rust_data_digest::ingestion::csv::ingest_csv;
use rust_data_digest::ingestion::dialect::guess_dialect_from_bytes;
use rust_data_digest::ingestion::Dialect;

const ROWS: usize = 50_000;

fn write_fixture() -> PathBuf {
    let mut text = String::from("id;price;qty;label\n");
    for i in 0..ROWS {
        let _ = writeln!(text, "{i};{:.2};{};item{}", (i % 977) as f64 * 1.25, i % 17, i % 100);
    }
    let path = std::env::temp_dir().join(format!("rust-data-digest-bench-{}.csv", std::process::id()));
    std::fs::write(&path, text).expect("write bench fixture");
    path
}

fn bench_ingestion(c: &mut Criterion) {
    let path = write_fixture();
    let dialect = Dialect {
        delimiter: b';',
        ..Default::default()
    };
    let full = IngestConfig::default();
    let streaming = IngestConfig {
        size_threshold_bytes: 0,
        chunk_row_count: 10_000,
        ..Default::default()
    };

    c.bench_function("ingest_full_load", |b| {
        b.iter(|| {
            let res = ingest_csv(black_box(&path), &dialect, &full).expect("full load");
            black_box(res.row_count)
        })
    });

    c.bench_function("ingest_streaming", |b| {
        b.iter(|| {
            let res = ingest_csv(black_box(&path), &dialect, &streaming).expect("streaming");
            black_box(res.row_count)
        })
    });

    let prefix = b"id;price;qty;label\n0;0.00;0;item0\n1;1.25;1;item1\n".repeat(40);
    c.bench_function("guess_dialect_1k_prefix", |b| {
        b.iter(|| black_box(guess_dialect_from_bytes(black_box(&prefix[..1000]), &[UTF_8])))
    });

    let _ = std::fs::remove_file(&path);
}

criterion_group!(benches, bench_ingestion);
criterion_main!(benches);
