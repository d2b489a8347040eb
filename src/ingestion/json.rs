//! JSON ingestion implementation.
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"a":1}, {"a":2}]`
//! - A single JSON object (one row)
//! - Newline-delimited JSON (NDJSON): `{"a":1}\n{"a":2}\n`
//!
//! Nested objects are flattened into dot-path columns (e.g. `user.name`). Arrays are kept as JSON
//! text and `null` becomes an empty cell. Items that are not objects (and NDJSON lines that do not
//! parse) are skipped and counted.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::IngestConfig;
use crate::error::{IngestionError, IngestionResult};

use super::result::{IngestResult, LoadedTable, SourceInfo, digest_full_table};
use super::unified::IngestionFormat;

/// Top-level layout of a JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonKind {
    Array,
    Object,
    Ndjson,
}

/// Structure analysis of a JSON document, written next to the processed outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsonShape {
    pub kind: JsonKind,
    /// Items in the array, lines in the NDJSON stream, or 1 for an object.
    pub length: usize,
    /// Keys of the object, or of the first item for arrays/NDJSON.
    pub keys: Vec<String>,
    /// Length of every list-valued key found at that level.
    pub nested_lists: BTreeMap<String, usize>,
}

/// A JSON document flattened into a text table.
#[derive(Debug, Clone)]
pub struct JsonTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub skipped_rows: usize,
    pub shape: JsonShape,
}

/// Ingest a JSON file. JSON is always loaded whole and then digested like a small CSV file.
pub fn ingest_json(path: impl AsRef<Path>, config: &IngestConfig) -> IngestionResult<IngestResult> {
    config.validate()?;
    let path = path.as_ref();
    let file_size_bytes = fs::metadata(path)?.len();
    if file_size_bytes == 0 {
        return Err(IngestionError::EmptyFile {
            path: path.to_path_buf(),
        });
    }
    info!(path = %path.display(), size_bytes = file_size_bytes, "ingesting json file");

    let table = read_json_table(path)?;
    if table.skipped_rows > 0 {
        warn!(path = %path.display(), skipped = table.skipped_rows, "non-object items skipped");
    }
    let loaded = LoadedTable {
        headers: table.headers,
        rows: table.rows,
        skipped_rows: table.skipped_rows,
    };
    let source = SourceInfo {
        path: path.to_path_buf(),
        format: IngestionFormat::Json,
        dialect: None,
        file_size_bytes,
    };
    Ok(digest_full_table(loaded, source, config))
}

/// Read and flatten the JSON file at `path`. Fails with [`IngestionError::Undecodable`] if the
/// file is not UTF-8.
pub fn read_json_table(path: impl AsRef<Path>) -> IngestionResult<JsonTable> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::InvalidData => IngestionError::Undecodable {
            encoding: "UTF-8".to_string(),
        },
        _ => IngestionError::Io(e),
    })?;
    read_json_table_from_str(&text)
}

/// Flatten JSON text into a [`JsonTable`].
pub fn read_json_table_from_str(input: &str) -> IngestionResult<JsonTable> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(IngestionError::UnsupportedFormat {
            message: "json input is empty".to_string(),
        });
    }

    // First try parsing as a single JSON value (array or object).
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Array(items)) => {
            let shape = shape_of_items(JsonKind::Array, &items);
            Ok(flatten_items(&items, 0, shape))
        }
        Ok(v @ serde_json::Value::Object(_)) => {
            let shape = shape_of_object(&v);
            Ok(flatten_items(std::slice::from_ref(&v), 0, shape))
        }
        Ok(_) => Err(IngestionError::UnsupportedFormat {
            message: "json must be an object, an array of objects, or NDJSON".to_string(),
        }),
        Err(whole_doc_err) => {
            // Fall back to NDJSON.
            let mut values = Vec::new();
            let mut bad_lines = 0usize;
            for line in trimmed.lines().map(str::trim).filter(|l| !l.is_empty()) {
                match serde_json::from_str::<serde_json::Value>(line) {
                    Ok(v) => values.push(v),
                    Err(_) => bad_lines += 1,
                }
            }
            if values.is_empty() {
                return Err(IngestionError::UnsupportedFormat {
                    message: format!("neither JSON nor NDJSON: {whole_doc_err}"),
                });
            }
            let shape = shape_of_items(JsonKind::Ndjson, &values);
            let mut table = flatten_items(&values, bad_lines, shape);
            table.shape.length += bad_lines;
            Ok(table)
        }
    }
}

fn flatten_items(items: &[serde_json::Value], skipped: usize, shape: JsonShape) -> JsonTable {
    let mut headers: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut sparse_rows: Vec<Vec<(usize, String)>> = Vec::with_capacity(items.len());
    let mut skipped_rows = skipped;

    for item in items {
        if !item.is_object() {
            skipped_rows += 1;
            continue;
        }
        let mut cells = Vec::new();
        flatten_value("", item, &mut cells);
        let row = cells
            .into_iter()
            .map(|(key, text)| {
                let idx = *index.entry(key.clone()).or_insert_with(|| {
                    headers.push(key);
                    headers.len() - 1
                });
                (idx, text)
            })
            .collect();
        sparse_rows.push(row);
    }

    let width = headers.len();
    let rows = sparse_rows
        .into_iter()
        .map(|cells| {
            let mut row = vec![String::new(); width];
            for (idx, text) in cells {
                row[idx] = text;
            }
            row
        })
        .collect();

    JsonTable {
        headers,
        rows,
        skipped_rows,
        shape,
    }
}

fn flatten_value(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_value(&path, child, out);
            }
        }
        other => out.push((prefix.to_string(), cell_text(other))),
    }
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn shape_of_object(value: &serde_json::Value) -> JsonShape {
    let (keys, nested_lists) = keys_and_lists(value);
    JsonShape {
        kind: JsonKind::Object,
        length: 1,
        keys,
        nested_lists,
    }
}

fn shape_of_items(kind: JsonKind, items: &[serde_json::Value]) -> JsonShape {
    let (keys, nested_lists) = items.first().map(keys_and_lists).unwrap_or_default();
    JsonShape {
        kind,
        length: items.len(),
        keys,
        nested_lists,
    }
}

fn keys_and_lists(value: &serde_json::Value) -> (Vec<String>, BTreeMap<String, usize>) {
    match value.as_object() {
        Some(map) => (
            map.keys().cloned().collect(),
            map.iter()
                .filter_map(|(k, v)| v.as_array().map(|a| (k.clone(), a.len())))
                .collect(),
        ),
        None => Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::{JsonKind, read_json_table_from_str};

    #[test]
    fn array_of_objects_flattens_nested_fields() {
        let t = read_json_table_from_str(
            r#"[{"id":1,"user":{"name":"Ada"},"tags":["a","b"]},{"id":2,"extra":null}]"#,
        )
        .unwrap();

        assert_eq!(t.headers, vec!["id", "user.name", "tags", "extra"]);
        assert_eq!(t.rows[0], vec!["1", "Ada", "[\"a\",\"b\"]", ""]);
        assert_eq!(t.rows[1], vec!["2", "", "", ""]);
        assert_eq!(t.shape.kind, JsonKind::Array);
        assert_eq!(t.shape.nested_lists.get("tags"), Some(&2));
    }

    #[test]
    fn ndjson_skips_bad_lines() {
        let t = read_json_table_from_str("{\"a\":1}\nnot json\n{\"a\":2}\n").unwrap();
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.skipped_rows, 1);
        assert_eq!(t.shape.kind, JsonKind::Ndjson);
        assert_eq!(t.shape.length, 3);
    }

    #[test]
    fn non_object_items_are_skipped() {
        let t = read_json_table_from_str(r#"[{"a":1}, 5, "x"]"#).unwrap();
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.skipped_rows, 2);
    }

    #[test]
    fn single_object_is_one_row() {
        let t = read_json_table_from_str(r#"{"items": [1,2,3], "total": 3}"#).unwrap();
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.shape.kind, JsonKind::Object);
        assert_eq!(t.shape.keys, vec!["items", "total"]);
    }

    #[test]
    fn scalar_or_garbage_is_rejected() {
        assert!(read_json_table_from_str("42").is_err());
        assert!(read_json_table_from_str("hello\nworld").is_err());
        assert!(read_json_table_from_str("   ").is_err());
    }
}
