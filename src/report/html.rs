//! HTML summary of a batch run.

use std::fmt::Write;

use crate::ingestion::IngestResult;
use crate::pipeline::{BatchReport, FileOutcome};

use super::histogram::{DEFAULT_BINS, Histogram};

/// Histograms drawn per file, at most.
pub const MAX_PLOTTED_COLUMNS: usize = 5;

const STYLE: &str = "body{font-family:sans-serif;margin:2em;color:#222}\
table{border-collapse:collapse;margin:1em 0}\
th,td{border:1px solid #ccc;padding:4px 8px;text-align:right}\
th:first-child,td:first-child{text-align:left}\
.failed{color:#c0392b}.ok{color:#27ae60}.plots svg{margin:0 1em 1em 0}";

/// Escape text for use in HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Render the whole report as a self-contained HTML document.
pub fn render_html(report: &BatchReport) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>Data report {date}</title><style>{STYLE}</style></head>\n<body>\n<h1>Data report {date}</h1>\n<p>Generated at {generated}.</p>\n",
        date = report.run_date,
        generated = report.generated_at.format("%Y-%m-%d %H:%M:%S"),
    );

    let _ = write!(
        html,
        "<h2>Summary</h2>\n<table><tr><th>Files</th><th>Ingested</th><th>Failed</th><th>Total rows</th></tr><tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr></table>\n",
        report.files.len(),
        report.ingested_count(),
        report.failed_count(),
        report.total_rows(),
    );

    if report.files.is_empty() {
        html.push_str("<p>No source files were found for this date.</p>\n");
    }

    for file in &report.files {
        let _ = write!(
            html,
            "<section>\n<h2>{}</h2>\n<p><code>{}</code></p>\n",
            escape_html(&file.name),
            escape_html(&file.path.display().to_string()),
        );
        match &file.outcome {
            FileOutcome::Failed { error, severity } => {
                let _ = write!(
                    html,
                    "<p class=\"failed\">Failed ({severity:?}): {}</p>\n",
                    escape_html(error)
                );
            }
            FileOutcome::Ingested { result, .. } => render_result(&mut html, result),
        }
        html.push_str("</section>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_result(html: &mut String, result: &IngestResult) {
    let _ = write!(
        html,
        "<p class=\"ok\">{rows} rows, {cols} columns, mode {mode:?}{trunc}. {skipped} malformed rows skipped.</p>\n",
        rows = result.row_count,
        cols = result.column_count,
        mode = result.mode,
        trunc = if result.truncated { " (truncated)" } else { "" },
        skipped = result.skipped_rows,
    );
    if let Some(d) = &result.dialect {
        let _ = write!(
            html,
            "<p>Delimiter <code>{}</code>, encoding {}{}.</p>\n",
            escape_html(&char::from(d.delimiter).escape_default().to_string()),
            d.encoding.name(),
            if d.lossy { " (lossy)" } else { "" },
        );
    }

    if !result.summaries.is_empty() {
        html.push_str(
            "<table><tr><th>Column</th><th>Count</th><th>Missing</th><th>Mean</th><th>Std</th><th>Min</th><th>Median</th><th>Max</th></tr>\n",
        );
        for name in &result.numeric_column_names {
            let Some(s) = result.summary(name) else {
                continue;
            };
            let median = s
                .quartiles
                .map(|q| format!("{:.2}", q.median))
                .unwrap_or_default();
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{}</td><td>{:.2}</td></tr>\n",
                escape_html(name),
                s.count,
                s.missing,
                s.mean,
                s.std,
                s.min,
                median,
                s.max,
            );
        }
        html.push_str("</table>\n");
    }

    render_missing(html, result);
    render_correlations(html, result);
    render_categories(html, result);

    if result.is_sample_degenerate() {
        html.push_str("<p>Sample is empty, nothing to plot.</p>\n");
        return;
    }
    let plots: Vec<String> = result
        .sample
        .schema
        .numeric_fields()
        .take(MAX_PLOTTED_COLUMNS)
        .filter_map(|(idx, name)| {
            Histogram::from_values(&result.sample.numeric_column(idx), DEFAULT_BINS)
                .map(|h| h.to_svg(name))
        })
        .collect();
    if plots.is_empty() {
        html.push_str("<p>No numeric column to plot.</p>\n");
    } else {
        let _ = write!(html, "<div class=\"plots\">{}</div>\n", plots.concat());
    }
}

/// Columns with missing cells, most affected first.
fn render_missing(html: &mut String, result: &IngestResult) {
    let mut missing: Vec<_> = result.missing.iter().filter(|m| m.missing > 0).collect();
    if missing.is_empty() {
        return;
    }
    missing.sort_by(|a, b| b.percent.total_cmp(&a.percent));
    html.push_str("<h3>Missing values</h3>\n<table><tr><th>Column</th><th>Missing</th><th>%</th></tr>\n");
    for m in missing {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{:.1}</td></tr>\n",
            escape_html(&m.column),
            m.missing,
            m.percent
        );
    }
    html.push_str("</table>\n");
}

fn render_correlations(html: &mut String, result: &IngestResult) {
    let Some(corr) = &result.correlations else {
        return;
    };
    html.push_str("<h3>Correlations</h3>\n<table><tr><th></th>");
    for col in &corr.columns {
        let _ = write!(html, "<th>{}</th>", escape_html(col));
    }
    html.push_str("</tr>\n");
    for (col, row) in corr.columns.iter().zip(&corr.values) {
        let _ = write!(html, "<tr><td>{}</td>", escape_html(col));
        for r in row {
            match r {
                Some(r) => {
                    let _ = write!(html, "<td>{r:.2}</td>");
                }
                None => html.push_str("<td></td>"),
            }
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");
}

fn render_categories(html: &mut String, result: &IngestResult) {
    for cat in &result.categories {
        let _ = write!(
            html,
            "<h3>Top values of {} ({} distinct)</h3>\n<table><tr><th>Value</th><th>Count</th><th>%</th></tr>\n",
            escape_html(&cat.column),
            cat.distinct
        );
        for v in &cat.top {
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{:.1}</td></tr>\n",
                escape_html(&v.value),
                v.count,
                v.percent
            );
        }
        html.push_str("</table>\n");
    }
}
