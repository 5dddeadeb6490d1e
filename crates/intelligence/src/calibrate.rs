//! Quantile calibration: sample the graph, derive
//! percentile breakpoints for keyword and vector score distributions so
//! the two channels become comparable.

use serde::{Deserialize, Serialize};

/// The seven percentiles spec.md §4.F names, in order.
const PERCENTILES: [f64; 7] = [0.0, 0.10, 0.25, 0.50, 0.75, 0.90, 1.00];

/// Breakpoints for one score channel (keyword or vector), plus the time
/// they were computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakpoints {
    /// Raw scores at p0, p10, p25, p50, p75, p90, p100, ascending.
    pub values: Vec<f32>,
    pub computed_at: chrono::DateTime<chrono::Utc>,
}

impl Breakpoints {
    /// Compute breakpoints from a sample of raw scores.
    /// Returns `None` if `samples` is empty — "a channel with no stored
    /// breakpoints yields quantile 0", which callers get by
    /// treating `None` the same way.
    pub fn compute(mut samples: Vec<f32>) -> Option<Breakpoints> {
        if samples.is_empty() {
            return None;
        }
        samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let values = PERCENTILES
            .iter()
            .map(|p| percentile(&samples, *p))
            .collect();
        Some(Breakpoints {
            values,
            computed_at: chrono::Utc::now(),
        })
    }

    /// Map a raw score to a quantile in `[0, 1]` by binary search on the
    /// breakpoints plus linear interpolation between neighbors.
    pub fn quantile_of(&self, raw: f32) -> f32 {
        let n = self.values.len();
        if n == 0 {
            return 0.0;
        }
        if raw <= self.values[0] {
            return 0.0;
        }
        if raw >= self.values[n - 1] {
            return 1.0;
        }
        let idx = match self
            .values
            .binary_search_by(|v| v.partial_cmp(&raw).unwrap_or(std::cmp::Ordering::Equal))
        {
            Ok(i) => return i as f32 / (n - 1) as f32,
            Err(i) => i,
        };
        let lo = idx - 1;
        let hi = idx;
        let lo_val = self.values[lo];
        let hi_val = self.values[hi];
        let lo_q = lo as f32 / (n - 1) as f32;
        let hi_q = hi as f32 / (n - 1) as f32;
        if (hi_val - lo_val).abs() < f32::EPSILON {
            return lo_q;
        }
        lo_q + (hi_q - lo_q) * (raw - lo_val) / (hi_val - lo_val)
    }
}

fn percentile(sorted: &[f32], p: f64) -> f32 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = (rank - lo as f64) as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Calibration state for both channels, persisted alongside the derived
/// store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Calibration {
    pub keyword: Option<Breakpoints>,
    pub vector: Option<Breakpoints>,
}

impl Calibration {
    /// Quantile for a keyword raw score; `0.0` if the channel has no
    /// breakpoints yet.
    pub fn keyword_quantile(&self, raw: f32) -> f32 {
        self.keyword.as_ref().map(|b| b.quantile_of(raw)).unwrap_or(0.0)
    }

    pub fn vector_quantile(&self, raw: f32) -> f32 {
        self.vector.as_ref().map(|b| b.quantile_of(raw)).unwrap_or(0.0)
    }
}
