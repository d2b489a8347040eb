//! Column profile beyond the numeric summaries: missing cells for every column, the most frequent
//! values of text columns, and Pearson correlations between numeric columns.

use std::collections::HashMap;

use serde::Serialize;

use crate::types::{DataSet, DataType, Schema, Value};

/// At most this many numeric columns enter the correlation matrix, and this many text columns get
/// value counts.
pub const MAX_PROFILED_COLUMNS: usize = 5;
/// Values listed per text column.
pub const TOP_VALUES: usize = 10;
/// Text columns with this many distinct values or more are treated as free text, not categories.
pub const MAX_CATEGORIES: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMissing {
    pub column: String,
    pub missing: u64,
    /// Share of rows, 0 to 100.
    pub percent: f64,
}

/// Running count of missing cells per column.
#[derive(Debug, Clone, Default)]
pub struct MissingCounter {
    rows: u64,
    missing: Vec<u64>,
}

impl MissingCounter {
    pub fn new(columns: usize) -> Self {
        Self {
            rows: 0,
            missing: vec![0; columns],
        }
    }

    /// Count one text row; a cell is missing if it is blank or does not parse as its column type.
    pub fn update_text(&mut self, schema: &Schema, row: &[String]) {
        self.rows += 1;
        for (idx, field) in schema.fields.iter().enumerate() {
            let present = row.get(idx).is_some_and(|cell| field.data_type.accepts(cell));
            if !present {
                self.missing[idx] += 1;
            }
        }
    }

    pub fn update_values(&mut self, row: &[Value]) {
        self.rows += 1;
        for (idx, count) in self.missing.iter_mut().enumerate() {
            if row.get(idx).is_none_or(Value::is_null) {
                *count += 1;
            }
        }
    }

    pub fn finish(&self, schema: &Schema) -> Vec<ColumnMissing> {
        schema
            .fields
            .iter()
            .zip(&self.missing)
            .map(|(field, &missing)| ColumnMissing {
                column: field.name.clone(),
                missing,
                percent: if self.rows == 0 {
                    0.0
                } else {
                    missing as f64 / self.rows as f64 * 100.0
                },
            })
            .collect()
    }
}

/// Missing cells of every column of `table`, in schema order.
pub fn missing_counts(table: &DataSet) -> Vec<ColumnMissing> {
    let mut counter = MissingCounter::new(table.schema.fields.len());
    for row in &table.rows {
        counter.update_values(row);
    }
    counter.finish(&table.schema)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: u64,
    /// Share of the column's non-missing cells, 0 to 100.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCounts {
    pub column: String,
    pub distinct: usize,
    pub top: Vec<ValueCount>,
}

/// Most frequent values of the first [`MAX_PROFILED_COLUMNS`] text columns.
///
/// Columns with a single distinct value, or [`MAX_CATEGORIES`] and more, are left out. Ties are
/// ordered by value.
pub fn category_counts(table: &DataSet) -> Vec<CategoryCounts> {
    table
        .schema
        .fields
        .iter()
        .enumerate()
        .filter(|(_, f)| f.data_type == DataType::Utf8)
        .take(MAX_PROFILED_COLUMNS)
        .filter_map(|(idx, field)| {
            let mut counts: HashMap<&str, u64> = HashMap::new();
            for row in &table.rows {
                if let Some(Value::Utf8(v)) = row.get(idx) {
                    *counts.entry(v.as_str()).or_default() += 1;
                }
            }
            let distinct = counts.len();
            if distinct <= 1 || distinct >= MAX_CATEGORIES {
                return None;
            }
            let total: u64 = counts.values().sum();
            let mut ranked: Vec<(&str, u64)> = counts.into_iter().collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            let top = ranked
                .into_iter()
                .take(TOP_VALUES)
                .map(|(value, count)| ValueCount {
                    value: value.to_string(),
                    count,
                    percent: count as f64 / total as f64 * 100.0,
                })
                .collect();
            Some(CategoryCounts {
                column: field.name.clone(),
                distinct,
                top,
            })
        })
        .collect()
}

/// Square matrix of Pearson coefficients; `values[i][j]` pairs `columns[i]` with `columns[j]`.
/// A coefficient is `None` when fewer than two rows have both values or either side is constant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    /// Correlations between the first [`MAX_PROFILED_COLUMNS`] numeric columns of `table`, using
    /// the rows where both columns have a value. `None` with fewer than two numeric columns.
    pub fn from_dataset(table: &DataSet) -> Option<Self> {
        let numeric: Vec<(usize, &str)> = table
            .schema
            .numeric_fields()
            .take(MAX_PROFILED_COLUMNS)
            .collect();
        if numeric.len() < 2 {
            return None;
        }

        let n = numeric.len();
        let mut values = vec![vec![None; n]; n];
        for i in 0..n {
            for j in i..n {
                let (xs, ys): (Vec<f64>, Vec<f64>) = table
                    .rows
                    .iter()
                    .filter_map(|row| {
                        let x = row.get(numeric[i].0).and_then(Value::as_f64)?;
                        let y = row.get(numeric[j].0).and_then(Value::as_f64)?;
                        Some((x, y))
                    })
                    .unzip();
                let r = pearson(&xs, &ys);
                values[i][j] = r;
                values[j][i] = r;
            }
        }
        Some(Self {
            columns: numeric.iter().map(|(_, name)| name.to_string()).collect(),
            values,
        })
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

/// Pearson correlation of two equally long series.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}
