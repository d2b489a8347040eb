use std::fs;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use rust_data_digest::IngestionError;
use rust_data_digest::config::IngestConfig;
use rust_data_digest::ingestion::{
    CompositeObserver, FileObserver, IngestMode, IngestionContext, IngestionFormat, IngestionObserver,
    IngestionOptions, IngestionSeverity, IngestionStats, ingest_from_path,
};

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<IngestionStats>>,
    failures: Mutex<Vec<IngestionSeverity>>,
    alerts: Mutex<Vec<IngestionSeverity>>,
}

impl IngestionObserver for RecordingObserver {
    fn on_success(&self, _ctx: &IngestionContext, stats: IngestionStats) {
        self.successes.lock().unwrap().push(stats);
    }

    fn on_failure(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &IngestionError) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &IngestionError) {
        self.alerts.lock().unwrap().push(severity);
    }
}

fn options(obs: Arc<dyn IngestionObserver>) -> IngestionOptions {
    IngestionOptions {
        observer: Some(obs),
        alert_at_or_above: IngestionSeverity::Critical,
        ..Default::default()
    }
}

#[test]
fn observer_receives_success_with_row_counts() {
    let obs = Arc::new(RecordingObserver::default());
    ingest_from_path("tests/fixtures/malformed.csv", &IngestConfig::default(), &options(obs.clone())).unwrap();

    let successes = obs.successes.lock().unwrap().clone();
    assert_eq!(
        successes,
        vec![IngestionStats {
            rows: 3,
            skipped_rows: 1,
            mode: IngestMode::Full,
            truncated: false,
        }]
    );
}

#[test]
fn observer_receives_failure_and_alert_on_critical_io_error() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = IngestionOptions {
        format: Some(IngestionFormat::Csv),
        ..options(obs.clone())
    };

    // Missing file -> Io error -> Critical
    let _ = ingest_from_path("tests/fixtures/does_not_exist.csv", &IngestConfig::default(), &opts).unwrap_err();

    let failures = obs.failures.lock().unwrap().clone();
    let alerts = obs.alerts.lock().unwrap().clone();
    assert_eq!(failures, vec![IngestionSeverity::Critical]);
    assert_eq!(alerts, vec![IngestionSeverity::Critical]);
}

#[test]
fn observer_receives_failure_without_alert_for_non_critical_error() {
    let obs = Arc::new(RecordingObserver::default());
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let path = std::env::temp_dir().join(format!("rust-data-digest-obs-empty-{nanos}.csv"));
    fs::write(&path, "").unwrap();

    // Empty file -> Error severity (not Critical) -> should not alert
    let _ = ingest_from_path(&path, &IngestConfig::default(), &options(obs.clone())).unwrap_err();

    let failures = obs.failures.lock().unwrap().clone();
    assert_eq!(failures, vec![IngestionSeverity::Error]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn unknown_extension_fails_before_reading() {
    let obs = Arc::new(RecordingObserver::default());
    let err = ingest_from_path("tests/fixtures/data.parquet", &IngestConfig::default(), &options(obs.clone()))
        .unwrap_err();
    assert!(matches!(err, IngestionError::UnsupportedFormat { .. }));
    // Format inference happens before an ingestion context exists.
    assert!(obs.failures.lock().unwrap().is_empty());
}

#[test]
fn composite_fans_out_and_file_observer_appends_lines() {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let log = std::env::temp_dir().join(format!("rust-data-digest-events-{nanos}.log"));

    let recording = Arc::new(RecordingObserver::default());
    let observers: Vec<Arc<dyn IngestionObserver>> =
        vec![recording.clone(), Arc::new(FileObserver::new(&log))];
    let opts = options(Arc::new(CompositeObserver::new(observers)));

    ingest_from_path("tests/fixtures/people.csv", &IngestConfig::default(), &opts).unwrap();
    let _ = ingest_from_path("tests/fixtures/missing.csv", &IngestConfig::default(), &opts);

    assert_eq!(recording.successes.lock().unwrap().len(), 1);
    let text = fs::read_to_string(&log).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("ok format=Csv"));
    assert!(lines[0].contains("rows=3 skipped=0 mode=Full"));
    assert!(lines[1].contains("fail severity=Critical"));
    assert!(lines[2].contains("ALERT"));
}

#[test]
fn streamed_stats_report_mode_and_truncation() {
    let obs = Arc::new(RecordingObserver::default());
    let cfg = IngestConfig {
        size_threshold_bytes: 0,
        chunk_row_count: 1,
        max_rows_scanned: Some(2),
        ..Default::default()
    };
    ingest_from_path("tests/fixtures/people.csv", &cfg, &options(obs.clone())).unwrap();

    let stats = obs.successes.lock().unwrap()[0];
    assert_eq!(stats.mode, IngestMode::Streamed);
    assert_eq!(stats.rows, 2);
    assert!(stats.truncated);
}
