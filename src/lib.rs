//! `rust-data-digest` turns the raw CSV/JSON files dropped in a directory each day into
//! statistics, processed copies and a run report.
//!
//! The primary entrypoint for one file is [`ingestion::ingest_from_path`], which sniffs the
//! delimiter and encoding of delimited files, then either loads the file whole or streams it in
//! bounded chunks, depending on its size. The result is an [`ingestion::IngestResult`]: row and
//! column counts, per-column numeric summaries and a bounded sample for plotting.
//!
//! For a whole run, [`pipeline::run_batch`] discovers the files of a date, ingests them one at a
//! time and writes their processed outputs; [`report::write_reports`] renders the JSON and HTML
//! reports.
//!
//! ## What you can ingest
//!
//! - **Delimited text**: `.csv`, `.tsv`, `.txt` (delimiter among `,` `;` tab `|`; encoding among
//!   the configured candidates, UTF-8 first)
//! - **JSON**: `.json` (object or array-of-objects) and `.ndjson`; nested objects flatten to
//!   dot-path columns such as `user.name`
//!
//! Column types are inferred ([`types::DataType::Int64`], [`types::DataType::Float64`],
//! [`types::DataType::Bool`], [`types::DataType::Utf8`]). Empty cells and JSON `null` map to
//! [`types::Value::Null`].
//!
//! ## Quick example
//!
//! ```no_run
//! use rust_data_digest::config::IngestConfig;
//! use rust_data_digest::ingestion::{ingest_from_path, IngestionOptions};
//!
//! # fn main() -> Result<(), rust_data_digest::IngestionError> {
//! let res = ingest_from_path("sales.csv", &IngestConfig::default(), &IngestionOptions::default())?;
//! for name in &res.numeric_column_names {
//!     if let Some(s) = res.summary(name) {
//!         println!("{name}: mean={} std={}", s.mean, s.std);
//!     }
//! }
//! println!("rows={} skipped={} sample={}", res.row_count, res.skipped_rows, res.sample_rows);
//! # Ok(())
//! # }
//! ```
//!
//! ## Batch run
//!
//! ```no_run
//! use chrono::Local;
//! use rust_data_digest::config::PipelineConfig;
//! use rust_data_digest::pipeline::run_batch;
//! use rust_data_digest::report::write_reports;
//!
//! # fn main() -> Result<(), rust_data_digest::IngestionError> {
//! let config = PipelineConfig::new(".");
//! let report = run_batch(&config, Local::now().date_naive(), None)?;
//! let paths = write_reports(&report, &config.report_dir)?;
//! println!("{} files, report at {}", report.files.len(), paths.html.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: dialect sniffing, CSV/JSON ingestion, observers
//! - [`stats`] and [`sampling`]: streaming accumulators and fixed-seed samplers
//! - [`profile`]: missing cells, top categories, correlations
//! - [`types`]: schema + in-memory dataset types
//! - [`discovery`], [`pipeline`], [`processing`], [`report`]: the daily batch run
//! - `notify`: Discord webhook (cargo feature `notify`)
//! - [`config`] and [`error`]

pub mod config;
pub mod discovery;
pub mod error;
pub mod ingestion;
#[cfg(feature = "notify")]
pub mod notify;
pub mod pipeline;
pub mod processing;
pub mod profile;
pub mod report;
pub mod sampling;
pub mod stats;
pub mod types;

#[cfg(feature = "notify")]
pub use error::NotifyError;
pub use error::{IngestionError, IngestionResult};
