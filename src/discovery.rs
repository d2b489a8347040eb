//! Locate the raw files to process for a given run date.
//!
//! A raw drop directory holds files named `{prefix}_{YYYY-MM-DD}.csv` / `.json`, plus
//! `{prefix}_{YYYY-MM-DD}_extracted/` directories for archives that were unpacked on download.
//! Only the most recently modified file per logical name is kept.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::NaiveDate;
use glob::Pattern;
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{IngestionError, IngestionResult};
use crate::ingestion::IngestionFormat;

/// A raw file selected for ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawSource {
    /// Logical source name, derived from the file name.
    pub name: String,
    pub path: PathBuf,
    pub format: IngestionFormat,
}

/// Find the sources dated `date` in `raw_dir`, ordered by logical name.
///
/// Fails if `raw_dir` cannot be read. An empty list is not an error.
pub fn discover_sources(raw_dir: impl AsRef<Path>, date: NaiveDate) -> IngestionResult<Vec<RawSource>> {
    let raw_dir = raw_dir.as_ref();
    fs::read_dir(raw_dir)?;

    let stamp = date.format("%Y-%m-%d").to_string();
    let base = Pattern::escape(&raw_dir.to_string_lossy());
    let mut latest: BTreeMap<String, (SystemTime, RawSource)> = BTreeMap::new();

    for ext in ["csv", "json"] {
        for path in glob_paths(&format!("{base}/*_{stamp}.{ext}"))? {
            if !path.is_file() {
                continue;
            }
            let Some(format) = IngestionFormat::from_path(&path) else {
                continue;
            };
            let source = RawSource {
                name: logical_name(&path),
                path,
                format,
            };
            keep_latest(&mut latest, source)?;
        }
    }

    for dir in glob_paths(&format!("{base}/*_{stamp}_extracted"))? {
        if !dir.is_dir() {
            continue;
        }
        let prefix = logical_name(&dir);
        let mut csv_files: Vec<PathBuf> = WalkDir::new(&dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| IngestionFormat::from_path(p) == Some(IngestionFormat::Csv))
            .collect();
        csv_files.sort();
        for (i, path) in csv_files.into_iter().enumerate() {
            let source = RawSource {
                name: format!("{prefix}_{}", i + 1),
                path,
                format: IngestionFormat::Csv,
            };
            keep_latest(&mut latest, source)?;
        }
    }

    let sources: Vec<RawSource> = latest.into_values().map(|(_, s)| s).collect();
    debug!(raw_dir = %raw_dir.display(), date = %stamp, found = sources.len(), "sources discovered");
    Ok(sources)
}

fn glob_paths(pattern: &str) -> IngestionResult<Vec<PathBuf>> {
    let entries = glob::glob(pattern).map_err(|e| IngestionError::InvalidConfig {
        message: format!("bad source pattern {pattern}: {e}"),
    })?;
    let mut out = Vec::new();
    for entry in entries {
        out.push(entry.map_err(|e| e.into_error())?);
    }
    Ok(out)
}

fn keep_latest(
    latest: &mut BTreeMap<String, (SystemTime, RawSource)>,
    source: RawSource,
) -> IngestionResult<()> {
    let modified = fs::metadata(&source.path)?.modified()?;
    match latest.get(&source.name) {
        Some((seen, _)) if *seen >= modified => {}
        _ => {
            latest.insert(source.name.clone(), (modified, source));
        }
    }
    Ok(())
}

/// File name up to the first `_`.
fn logical_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.split('_').next() {
        Some(prefix) if !prefix.is_empty() => prefix.to_string(),
        _ => file_name,
    }
}
