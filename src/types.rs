//! Core data model types.
//!
//! Raw files arrive without a schema, so a [`Schema`] is inferred from the text cells (see
//! [`DataType::infer`]) and rows are then held as typed [`Value`]s in a [`DataSet`]. The only
//! `DataSet` that outlives ingestion is the bounded sample carried by
//! [`crate::ingestion::IngestResult`].

use std::fmt;

use serde::Serialize;

/// Logical data type for a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
}

impl DataType {
    /// Whether the column takes part in numeric summary statistics.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int64 | Self::Float64)
    }

    /// Whether `raw` holds a value of this type; blank cells never do.
    pub fn accepts(self, raw: &str) -> bool {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return false;
        }
        match self {
            Self::Utf8 => true,
            Self::Int64 => trimmed.parse::<i64>().is_ok(),
            Self::Float64 => parse_finite_f64(trimmed).is_some(),
            Self::Bool => parse_bool(trimmed).is_some(),
        }
    }

    /// Infer the narrowest type that accepts every non-empty cell.
    ///
    /// Precedence is `Int64`, then `Float64`, then `Bool`, falling back to `Utf8`. A column with
    /// no non-empty cells is `Utf8`.
    pub fn infer<'a, I>(cells: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = false;
        let mut int = true;
        let mut float = true;
        let mut boolean = true;

        for cell in cells {
            let cell = cell.trim();
            if cell.is_empty() {
                continue;
            }
            seen = true;
            if int && cell.parse::<i64>().is_err() {
                int = false;
            }
            if float && parse_finite_f64(cell).is_none() {
                float = false;
            }
            if boolean && parse_bool(cell).is_none() {
                boolean = false;
            }
            if !int && !float && !boolean {
                break;
            }
        }

        match (seen, int, float, boolean) {
            (false, ..) => Self::Utf8,
            (true, true, ..) => Self::Int64,
            (true, false, true, _) => Self::Float64,
            (true, false, false, true) => Self::Bool,
            _ => Self::Utf8,
        }
    }
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// An ordered list of fields describing the shape of a table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Infer a schema from header names and text rows.
    ///
    /// Cells missing from short rows are treated as empty.
    pub fn infer(headers: &[String], rows: &[Vec<String>]) -> Self {
        let fields = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let cells = rows
                    .iter()
                    .map(|row| row.get(idx).map(String::as_str).unwrap_or(""));
                Field::new(name.clone(), DataType::infer(cells))
            })
            .collect();
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// `(index, name)` of every numeric field, in schema order.
    pub fn numeric_fields(&self) -> impl Iterator<Item = (usize, &str)> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.data_type.is_numeric())
            .map(|(idx, f)| (idx, f.name.as_str()))
    }
}

/// A single typed value in a [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// Parse a text cell as `data_type`.
    ///
    /// Empty cells and cells that do not parse become [`Value::Null`]; ingestion is lenient at
    /// the cell level.
    pub fn parse(raw: &str, data_type: DataType) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Null;
        }
        match data_type {
            DataType::Utf8 => Self::Utf8(trimmed.to_owned()),
            DataType::Int64 => trimmed.parse().map(Self::Int64).unwrap_or(Self::Null),
            DataType::Float64 => parse_finite_f64(trimmed).map(Self::Float64).unwrap_or(Self::Null),
            DataType::Bool => parse_bool(trimmed).map(Self::Bool).unwrap_or(Self::Null),
        }
    }

    /// Numeric view of the value; `None` for nulls and non-numeric variants.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int64(v) => Some(*v as f64),
            Self::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Utf8(v) => f.write_str(v),
        }
    }
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Build a typed dataset from text rows, parsing each cell with its field type.
    pub fn from_text_rows(schema: Schema, rows: &[Vec<String>]) -> Self {
        let rows = rows
            .iter()
            .map(|row| {
                schema
                    .fields
                    .iter()
                    .enumerate()
                    .map(|(idx, field)| {
                        Value::parse(row.get(idx).map(String::as_str).unwrap_or(""), field.data_type)
                    })
                    .collect()
            })
            .collect();
        Self { schema, rows }
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Non-null numeric values of column `idx`, in row order.
    pub fn numeric_column(&self, idx: usize) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.get(idx).and_then(Value::as_f64))
            .collect()
    }
}

pub(crate) fn parse_finite_f64(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" => Some(true),
        "false" | "f" | "no" | "n" => Some(false),
        _ => None,
    }
}
