//! Computing bin boundaries from raw feature values.

use bon::Builder;

use super::BinMapper;
use super::bin_mapper::normalize_value;

// =============================================================================
// Binning Configuration
// =============================================================================

/// Configuration for feature binning.
///
/// # Example
///
/// ```
/// use lgbm_core::data::BinningConfig;
///
/// let config = BinningConfig::builder().max_bins(15).build();
/// assert_eq!(config.sample_cnt, 200_000);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Builder)]
#[builder(derive(Clone, Debug))]
pub struct BinningConfig {
    /// Maximum bins per feature (default: 255).
    #[builder(default = 255)]
    pub max_bins: u32,
    /// Rows sampled for computing bin boundaries (default: 200K).
    /// Larger columns are sampled with a uniform stride.
    #[builder(default = 200_000)]
    pub sample_cnt: usize,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl From<u32> for BinningConfig {
    fn from(max_bins: u32) -> Self {
        Self::builder().max_bins(max_bins).build()
    }
}

// =============================================================================
// Boundary construction
// =============================================================================

/// Build the bin mapper of one numeric column.
///
/// Distinct values get their own bin while they fit in `max_bins`; otherwise
/// bins hold roughly equal row counts, and values frequent enough to fill a
/// bin alone get a bin of their own.
pub fn bin_numeric(values: &[f64], config: &BinningConfig) -> BinMapper {
    let mut sample: Vec<f64> = sample_values(values, config.sample_cnt)
        .map(normalize_value)
        .filter(|v| v.is_finite())
        .collect();

    if sample.is_empty() {
        return BinMapper::trivial(0.0);
    }

    sample.sort_by(|a, b| a.total_cmp(b));
    let min_val = sample[0];
    let max_val = sample[sample.len() - 1];

    let (distinct, counts) = count_distinct(&sample);
    if distinct.len() <= 1 {
        return BinMapper::trivial(min_val);
    }

    let bounds = find_bin_bounds(&distinct, &counts, config.max_bins.max(1) as usize);
    BinMapper::numerical(bounds, min_val, max_val)
}

/// Uniform-stride sample of at most about `sample_cnt` values.
fn sample_values(values: &[f64], sample_cnt: usize) -> impl Iterator<Item = f64> + '_ {
    let step = if sample_cnt > 0 && values.len() > sample_cnt {
        values.len() / sample_cnt
    } else {
        1
    };
    values.iter().step_by(step.max(1)).copied()
}

/// Collapse a sorted slice into distinct values and their counts.
/// `-0.0` and `0.0` count as the same value.
fn count_distinct(sorted: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut distinct: Vec<f64> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    for &v in sorted {
        match distinct.last() {
            Some(&last) if last == v => {
                if let Some(c) = counts.last_mut() {
                    *c += 1;
                }
            }
            _ => {
                distinct.push(v);
                counts.push(1);
            }
        }
    }
    (distinct, counts)
}

#[inline]
fn midpoint(a: f64, b: f64) -> f64 {
    a / 2.0 + b / 2.0
}

#[inline]
fn push_bound(bounds: &mut Vec<f64>, bound: f64) {
    if bound < f64::MAX && bounds.last().is_none_or(|&last| bound > last) {
        bounds.push(bound);
    }
}

/// Greedy upper bounds over distinct values (ascending) with counts.
///
/// Always returns a strictly increasing list terminated by `f64::MAX` with at
/// most `max_bins` entries.
pub(crate) fn find_bin_bounds(distinct: &[f64], counts: &[usize], max_bins: usize) -> Vec<f64> {
    let n = distinct.len();
    let mut bounds = Vec::with_capacity(max_bins.min(n));

    if n <= max_bins {
        for i in 0..n.saturating_sub(1) {
            push_bound(&mut bounds, midpoint(distinct[i], distinct[i + 1]));
        }
        bounds.push(f64::MAX);
        return bounds;
    }

    let total: usize = counts.iter().sum();
    let initial_mean = total as f64 / max_bins as f64;
    let is_big: Vec<bool> = counts.iter().map(|&c| c as f64 >= initial_mean).collect();

    let big_bins = is_big.iter().filter(|&&b| b).count();
    let big_rows: usize = counts
        .iter()
        .zip(&is_big)
        .filter(|(_, big)| **big)
        .map(|(c, _)| c)
        .sum();
    let mut rest_bins = max_bins.saturating_sub(big_bins);
    let mut rest_rows = total - big_rows;
    let mean_of = |rows: usize, bins: usize| {
        if bins > 0 { rows as f64 / bins as f64 } else { f64::INFINITY }
    };
    let mut mean_bin_size = mean_of(rest_rows, rest_bins);

    let mut in_bin = 0usize;
    for i in 0..n - 1 {
        if !is_big[i] {
            rest_rows -= counts[i];
        }
        in_bin += counts[i];

        let close = is_big[i]
            || in_bin as f64 >= mean_bin_size
            || (is_big[i + 1] && in_bin as f64 >= (mean_bin_size * 0.5).max(1.0));
        if !close {
            continue;
        }

        push_bound(&mut bounds, midpoint(distinct[i], distinct[i + 1]));
        if bounds.len() + 1 >= max_bins {
            break;
        }
        in_bin = 0;
        if !is_big[i] {
            rest_bins = rest_bins.saturating_sub(1);
            mean_bin_size = mean_of(rest_rows, rest_bins);
        }
    }

    bounds.push(f64::MAX);
    bounds
}
