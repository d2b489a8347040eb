//! Dialect sniffing: field delimiter and text encoding from a byte prefix.
//!
//! Both guesses are heuristics. Free text with many commas but no tabular structure will be
//! "detected" as comma-delimited; callers must tolerate the resulting parse noise (it shows up as
//! skipped rows, not as errors).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use encoding_rs::{Encoding, UTF_8};
use serde::{Serialize, Serializer};

use crate::config::IngestConfig;
use crate::error::{IngestionError, IngestionResult};

/// Delimiters considered, in tie-break order.
pub const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Field delimiter plus text encoding assumed when parsing a delimited file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
    /// No candidate encoding decoded the prefix; undecodable bytes are replaced, not rejected.
    pub lossy: bool,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            delimiter: b',',
            encoding: UTF_8,
            lossy: false,
        }
    }
}

impl Dialect {
    /// Serializable description for reports.
    pub fn summary(&self) -> DialectSummary {
        DialectSummary {
            delimiter: char::from(self.delimiter).to_string(),
            encoding: self.encoding.name().to_string(),
            lossy: self.lossy,
        }
    }
}

/// Serializes as its [`DialectSummary`].
impl Serialize for Dialect {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.summary().serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialectSummary {
    pub delimiter: String,
    pub encoding: String,
    pub lossy: bool,
}

/// Guess the dialect of the file at `path` with the default prefix size and encoding candidates.
pub fn guess_dialect(path: impl AsRef<Path>) -> IngestionResult<Dialect> {
    let cfg = IngestConfig::default();
    guess_dialect_with(path, cfg.dialect_prefix_bytes, &cfg.encoding_candidates()?)
}

/// Guess the dialect from the first `prefix_bytes` bytes of the file at `path`.
///
/// Fails if the file cannot be opened or is empty.
pub fn guess_dialect_with(
    path: impl AsRef<Path>,
    prefix_bytes: usize,
    candidates: &[&'static Encoding],
) -> IngestionResult<Dialect> {
    let path = path.as_ref();
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Err(IngestionError::EmptyFile {
            path: path.to_path_buf(),
        });
    }

    let mut prefix = Vec::with_capacity(prefix_bytes);
    file.take(prefix_bytes as u64).read_to_end(&mut prefix)?;
    Ok(guess_dialect_from_bytes(&prefix, candidates))
}

/// Pure dialect guess from a byte prefix.
pub fn guess_dialect_from_bytes(prefix: &[u8], candidates: &[&'static Encoding]) -> Dialect {
    let body = prefix.strip_prefix(UTF8_BOM).unwrap_or(prefix);
    let (encoding, lossy) = guess_encoding(body, candidates);
    Dialect {
        delimiter: guess_delimiter(body),
        encoding,
        lossy,
    }
}

/// The candidate with the most occurrences wins; ties go to the earlier candidate.
pub fn guess_delimiter(prefix: &[u8]) -> u8 {
    let mut best = DELIMITER_CANDIDATES[0];
    let mut best_count = 0usize;
    for candidate in DELIMITER_CANDIDATES {
        let count = prefix.iter().filter(|&&b| b == candidate).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

/// First candidate that decodes `prefix` without error, else lossy UTF-8.
pub fn guess_encoding(prefix: &[u8], candidates: &[&'static Encoding]) -> (&'static Encoding, bool) {
    candidates
        .iter()
        .copied()
        .find(|enc| decodes_cleanly(*enc, prefix))
        .map(|enc| (enc, false))
        .unwrap_or((UTF_8, true))
}

fn decodes_cleanly(encoding: &'static Encoding, bytes: &[u8]) -> bool {
    if encoding == UTF_8 {
        // The prefix may end in the middle of a multi-byte sequence.
        return match std::str::from_utf8(bytes) {
            Ok(_) => true,
            Err(e) => e.error_len().is_none(),
        };
    }
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .is_some()
}
