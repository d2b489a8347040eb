use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::NaiveDate;

use rust_data_digest::config::PipelineConfig;
use rust_data_digest::ingestion::IngestionSeverity;
use rust_data_digest::pipeline::{FileOutcome, run_batch};
use rust_data_digest::report::write_reports;

fn tmp_base(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("rust-data-digest-{name}-{nanos}"))
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

fn config_with_raw_files(name: &str, files: &[(&str, &str)]) -> PipelineConfig {
    let config = PipelineConfig::new(tmp_base(name));
    fs::create_dir_all(&config.raw_dir).unwrap();
    for (file, body) in files {
        fs::write(config.raw_dir.join(file), body).unwrap();
    }
    config
}

#[test]
fn one_entry_per_source_and_bad_files_do_not_abort_the_batch() {
    let config = config_with_raw_files(
        "batch",
        &[
            ("sales_2024-05-01.csv", "id;amount\n1;10\n2;20\n2;20\n"),
            ("events_2024-05-01.json", r#"[{"id":1,"meta":{"k":"v"}},{"id":2}]"#),
            ("broken_2024-05-01.csv", ""),
            ("sales_2024-04-30.csv", "id\n1\n"),
        ],
    );

    let report = run_batch(&config, day(), None).unwrap();
    let names: Vec<&str> = report.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["broken", "events", "sales"]);
    assert_eq!(report.ingested_count(), 2);
    assert_eq!(report.failed_count(), 1);

    match &report.files[0].outcome {
        FileOutcome::Failed { severity, error } => {
            assert_eq!(*severity, IngestionSeverity::Error);
            assert!(error.contains("empty"));
        }
        other => panic!("expected failure, got {other:?}"),
    }

    let processed = &config.processed_dir;
    assert!(processed.join("sales_stats.csv").exists());
    assert!(processed.join("sales_sample.csv").exists());
    assert!(processed.join("events_structure.json").exists());
    let clean = fs::read_to_string(processed.join("sales_clean.csv")).unwrap();
    assert_eq!(clean, "id,amount\n1,10\n2,20\n");

    let stats = fs::read_to_string(processed.join("sales_stats.csv")).unwrap();
    assert!(stats.starts_with("column,count,missing,mean"));
    assert!(stats.contains("\namount,3,0,"));
}

#[test]
fn reports_are_written_with_canonical_field_names() {
    let config = config_with_raw_files("reports", &[("sales_2024-05-01.csv", "id,amount\n1,10\n2,30\n")]);
    let report = run_batch(&config, day(), None).unwrap();
    let paths = write_reports(&report, &config.report_dir).unwrap();

    assert!(paths.json.ends_with("report_2024-05-01.json"));
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&paths.json).unwrap()).unwrap();
    assert_eq!(json["run_date"], "2024-05-01");
    let file = &json["files"][0];
    assert_eq!(file["name"], "sales");
    assert_eq!(file["status"], "ingested");
    assert_eq!(file["result"]["row_count"], 2);
    assert_eq!(file["result"]["mode"], "full");
    assert_eq!(file["result"]["dialect"]["delimiter"], ",");
    assert_eq!(file["result"]["summaries"]["amount"]["mean"], 20.0);
    assert_eq!(file["result"]["missing"][1]["column"], "amount");
    assert_eq!(file["result"]["missing"][1]["missing"], 0);
    assert_eq!(file["result"]["correlations"]["columns"][1], "amount");
    assert_eq!(file["result"]["correlations"]["values"][0][1], 1.0);
    assert!(file["result"]["categories"].as_array().unwrap().is_empty());

    let html = fs::read_to_string(&paths.html).unwrap();
    assert!(html.contains("<h2>sales</h2>"));
    assert!(html.contains("<svg"));
}

#[test]
fn no_sources_is_an_empty_report_not_an_error() {
    let config = config_with_raw_files("no-sources", &[]);
    let report = run_batch(&config, day(), None).unwrap();
    assert!(report.files.is_empty());
    assert!(config.report_dir.exists());
}

#[test]
fn missing_raw_dir_fails_the_run() {
    let config = PipelineConfig::new(tmp_base("no-raw-dir"));
    assert!(run_batch(&config, day(), None).is_err());
}
