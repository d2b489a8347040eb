use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Error type returned by ingestion, processing and reporting functions.
///
/// Every variant is fatal for the file being ingested. Row-level problems never surface here:
/// they are counted in [`crate::ingestion::IngestResult::skipped_rows`].
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader/writer error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parse or serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The file exists but has zero bytes.
    #[error("file is empty: {}", path.display())]
    EmptyFile { path: PathBuf },

    /// The input has bytes but no header record.
    #[error("no header row found")]
    MissingHeader,

    /// The header line of a delimited file, or a whole JSON document, does not decode with
    /// `encoding`.
    #[error("input is not decodable as {encoding}")]
    Undecodable { encoding: String },

    /// The input format could not be determined or is not supported.
    #[error("unsupported format: {message}")]
    UnsupportedFormat { message: String },

    /// A configuration value is out of range.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Error returned when a notification cannot be delivered.
#[cfg(feature = "notify")]
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Transport-level failure (DNS, TLS, connection reset...).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The webhook answered with a non-success status.
    #[error("webhook returned status {status}: {body}")]
    Status { status: u16, body: String },
}
