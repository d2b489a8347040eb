//! Per-column numeric summary statistics.
//!
//! Both ingestion paths feed values through the same [`ColumnAccumulator`], so a streamed file and
//! the same file loaded whole report identical count/mean/variance/min/max (up to float
//! rounding). Quartiles need every value at once and therefore only exist for full loads.
//!
//! The accumulator keeps a running `sum` and `sum_sq` and derives
//! `variance = sum_sq / count - mean^2`. This loses precision for columns whose magnitude is large
//! relative to their spread (catastrophic cancellation); the result may even come out slightly
//! negative, in which case it is clamped to zero. This is a known limitation of the streaming
//! statistics.

use serde::Serialize;

/// Running aggregates for one numeric column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnAccumulator {
    count: u64,
    missing: u64,
    sum: f64,
    sum_sq: f64,
    min: f64,
    max: f64,
}

impl Default for ColumnAccumulator {
    fn default() -> Self {
        Self {
            count: 0,
            missing: 0,
            sum: 0.0,
            sum_sq: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl ColumnAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one value; `None` counts as missing.
    pub fn update(&mut self, value: Option<f64>) {
        match value {
            Some(v) if v.is_finite() => {
                self.count += 1;
                self.sum += v;
                self.sum_sq += v * v;
                self.min = self.min.min(v);
                self.max = self.max.max(v);
            }
            _ => self.missing += 1,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Derive the summary. Returns `None` if no value was recorded.
    pub fn finish(&self) -> Option<ColumnSummary> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        let mean = (self.sum / n).clamp(self.min, self.max);
        let variance = (self.sum_sq / n - mean * mean).max(0.0);
        Some(ColumnSummary {
            count: self.count,
            missing: self.missing,
            mean,
            variance,
            std: variance.sqrt(),
            min: self.min,
            max: self.max,
            quartiles: None,
        })
    }
}

/// Summary statistics for one numeric column. Variance is the population variance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub count: u64,
    pub missing: u64,
    pub mean: f64,
    pub variance: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quartiles: Option<Quartiles>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quartiles {
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
}

impl Quartiles {
    /// Quartiles with linear interpolation between closest ranks. `None` for an empty slice.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Some(Self {
            q25: quantile_sorted(&sorted, 0.25),
            median: quantile_sorted(&sorted, 0.5),
            q75: quantile_sorted(&sorted, 0.75),
        })
    }
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
