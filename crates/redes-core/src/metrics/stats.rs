//! Descriptive statistics over monetary values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Percentiles reported by [`ValueSummary`].
pub const PERCENTILES: &[u32] = &[10, 25, 50, 75, 90, 95, 99];

/// Single-pass mean / variance / extrema (Welford).
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: usize,
    mean: f64,
    m2: f64,
    sum: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, x: f64) {
        if self.count == 0 {
            self.min = x;
            self.max = x;
        } else {
            self.min = self.min.min(x);
            self.max = self.max.max(x);
        }
        self.count += 1;
        self.sum += x;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample standard deviation (n − 1); 0 with fewer than two values.
    pub fn std(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            (self.m2 / (self.count - 1) as f64).sqrt()
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Linear-interpolated percentile of an ascending slice.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
        }
    }
}

/// Summary of a value column.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ValueSummary {
    pub count: usize,
    pub total: f64,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub percentiles: BTreeMap<String, f64>,
}

impl ValueSummary {
    /// Summarise `values`, sorting them in place.
    pub fn from_values(values: &mut [f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        values.sort_by(|a, b| a.total_cmp(b));

        let mut running = RunningStats::new();
        for &v in values.iter() {
            running.push(v);
        }

        let percentiles = PERCENTILES
            .iter()
            .map(|&p| (format!("p{p}"), percentile_sorted(values, p as f64)))
            .collect();

        Self {
            count: running.count(),
            total: running.sum(),
            mean: running.mean(),
            median: percentile_sorted(values, 50.0),
            std: running.std(),
            min: running.min(),
            max: running.max(),
            percentiles,
        }
    }
}

/// Share of `total` held by the `n` largest entries of `sorted_desc`, in percent.
pub fn concentration(sorted_desc: &[f64], n: usize) -> f64 {
    let total: f64 = sorted_desc.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let head: f64 = sorted_desc.iter().take(n).sum();
    head / total * 100.0
}
