//! Fixed-bin histograms rendered as inline SVG.

use std::fmt::Write;

pub const DEFAULT_BINS: usize = 20;

const WIDTH: f64 = 400.0;
const HEIGHT: f64 = 160.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bucket the finite values into `bins` equal-width bins over `[min, max]`.
    ///
    /// Returns `None` when there is no finite value or `bins == 0`. A constant column puts every
    /// value in the first bin.
    pub fn from_values(values: &[f64], bins: usize) -> Option<Self> {
        if bins == 0 {
            return None;
        }
        let finite = values.iter().copied().filter(|v| v.is_finite());
        let (min, max) = finite.clone().fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;

        let mut counts = vec![0usize; bins];
        let width = (max - min) / bins as f64;
        for v in finite {
            let idx = if width > 0.0 {
                (((v - min) / width) as usize).min(bins - 1)
            } else {
                0
            };
            counts[idx] += 1;
        }
        Some(Self { min, max, counts })
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Bar chart as a standalone `<svg>` element.
    pub fn to_svg(&self, title: &str) -> String {
        let peak = self.counts.iter().copied().max().unwrap_or(0).max(1) as f64;
        let bar_w = WIDTH / self.counts.len().max(1) as f64;
        let mut svg = String::new();
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{}" role="img"><title>{}</title>"#,
            HEIGHT + 20.0,
            super::html::escape_html(title)
        );
        for (i, &count) in self.counts.iter().enumerate() {
            let h = count as f64 / peak * HEIGHT;
            let _ = write!(
                svg,
                r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="#3498db"/>"##,
                i as f64 * bar_w,
                HEIGHT - h,
                (bar_w - 1.0).max(0.5),
                h
            );
        }
        let _ = write!(
            svg,
            r#"<text x="0" y="{y}" font-size="11">{min}</text><text x="{WIDTH}" y="{y}" font-size="11" text-anchor="end">{max}</text></svg>"#,
            y = HEIGHT + 15.0,
            min = format_axis(self.min),
            max = format_axis(self.max),
        );
        svg
    }
}

fn format_axis(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v:.3}")
    }
}

#[cfg(test)]
mod tests {
    use super::Histogram;

    #[test]
    fn values_spread_across_bins_and_max_lands_in_last_bin() {
        let values: Vec<f64> = (0..=100).map(f64::from).collect();
        let h = Histogram::from_values(&values, 10).unwrap();
        assert_eq!(h.counts.len(), 10);
        assert_eq!(h.total(), 101);
        assert_eq!(h.counts[9], 11);
    }

    #[test]
    fn constant_column_uses_first_bin() {
        let h = Histogram::from_values(&[5.0, 5.0, 5.0], 20).unwrap();
        assert_eq!(h.counts[0], 3);
    }

    #[test]
    fn no_finite_values_means_no_histogram() {
        assert!(Histogram::from_values(&[], 20).is_none());
        assert!(Histogram::from_values(&[f64::NAN], 20).is_none());
    }

    #[test]
    fn svg_has_one_bar_per_bin() {
        let h = Histogram::from_values(&[1.0, 2.0, 3.0], 4).unwrap();
        let svg = h.to_svg("a<b");
        assert_eq!(svg.matches("<rect").count(), 4);
        assert!(svg.contains("a&lt;b"));
    }
}
