//! Row sampling with fixed seeds.
//!
//! - [`sample_exact`]: a uniform random subset of exactly `n` rows (full loads).
//! - [`Reservoir`]: a capped sample fed one chunk at a time with a fixed fraction of each chunk
//!   (streaming loads). Once the cap is reached further chunks are ignored.
//!
//! Both keep the relative order of the rows they select.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;

/// Keep a uniform random subset of exactly `n` rows, or every row if there are no more than `n`.
pub fn sample_exact<T>(rows: Vec<T>, n: usize, seed: u64) -> Vec<T> {
    if rows.len() <= n {
        return rows;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = index::sample(&mut rng, rows.len(), n).into_vec();
    picked.sort_unstable();

    let mut keep = picked.into_iter().peekable();
    rows.into_iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            if keep.peek() == Some(&idx) {
                keep.next();
                Some(row)
            } else {
                None
            }
        })
        .collect()
}

/// A size-capped sample built from successive chunks.
#[derive(Debug)]
pub struct Reservoir<T> {
    cap: usize,
    fraction: f64,
    rows: Vec<T>,
    rng: StdRng,
}

impl<T: Clone> Reservoir<T> {
    pub fn new(cap: usize, fraction: f64, seed: u64) -> Self {
        Self {
            cap,
            fraction: fraction.clamp(0.0, 1.0),
            rows: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw `round(chunk.len() * fraction)` rows from `chunk`, truncated to the remaining
    /// capacity. Returns the number of rows taken.
    pub fn offer_chunk(&mut self, chunk: &[T]) -> usize {
        if self.is_full() || chunk.is_empty() {
            return 0;
        }
        let wanted = ((chunk.len() as f64) * self.fraction).round() as usize;
        let take = wanted.min(chunk.len()).min(self.cap - self.rows.len());
        if take == 0 {
            return 0;
        }

        let mut picked = index::sample(&mut self.rng, chunk.len(), take).into_vec();
        picked.sort_unstable();
        self.rows.extend(picked.into_iter().map(|idx| chunk[idx].clone()));
        take
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.rows.len() >= self.cap
    }

    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }
}
