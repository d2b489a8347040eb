//! Ingestion entrypoints and implementations.
//!
//! Most callers should use [`ingest_from_path`] (from [`unified`]) which:
//!
//! - auto-detects format by file extension (or you can override via [`IngestionOptions`])
//! - sniffs the delimiter and encoding of delimited files ([`dialect`])
//! - loads small files whole and streams large ones in bounded chunks
//! - optionally reports success/failure/alerts to an [`IngestionObserver`]
//!
//! Format-specific functions are also available under:
//! - [`csv`]
//! - [`json`]

pub mod csv;
pub mod dialect;
pub mod json;
pub mod observability;
pub mod result;
pub mod unified;

pub use dialect::{Dialect, DialectSummary, guess_dialect, guess_dialect_with};
pub use observability::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats,
    TracingObserver,
};
pub use result::{IngestMode, IngestResult};
pub use unified::{IngestionFormat, IngestionOptions, ingest_from_path, severity_for_error};
