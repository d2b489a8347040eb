//! Run reports: `report_{date}.json` and `report_{date}.html` in the report directory.

pub mod histogram;
pub mod html;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::IngestionResult;
use crate::pipeline::BatchReport;

pub use histogram::Histogram;
pub use html::{escape_html, render_html};

/// Paths of the files written by [`write_reports`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub html: PathBuf,
}

pub fn write_reports(report: &BatchReport, report_dir: impl AsRef<Path>) -> IngestionResult<ReportPaths> {
    let report_dir = report_dir.as_ref();
    fs::create_dir_all(report_dir)?;
    let stamp = report.run_date.format("%Y-%m-%d");

    let json = report_dir.join(format!("report_{stamp}.json"));
    serde_json::to_writer_pretty(BufWriter::new(File::create(&json)?), report)?;

    let html = report_dir.join(format!("report_{stamp}.html"));
    fs::write(&html, render_html(report))?;

    info!(json = %json.display(), html = %html.display(), "reports written");
    Ok(ReportPaths { json, html })
}
