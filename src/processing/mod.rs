//! Processed outputs written next to each ingested source.
//!
//! For a source named `sales` the processed directory receives:
//!
//! - `sales_stats.csv`: one line per numeric column ([`write_stats_csv`])
//! - `sales_sample.csv`: the bounded sample ([`write_sample_csv`])
//! - `sales_clean.csv`: deduplicated comma/UTF-8 rewrite, full-load-sized sources only
//!   ([`write_clean_csv`])
//! - `sales_structure.json`: JSON sources only ([`write_json_structure`])

pub mod clean;
pub mod export;

pub use clean::{CleanSummary, write_clean_csv};
pub use export::{write_json_structure, write_sample_csv, write_stats_csv};
