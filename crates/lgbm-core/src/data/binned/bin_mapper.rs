//! Mapping from feature values to bin indices.

use serde::{Deserialize, Serialize};

/// Value substituted for NaN before binning and before tree traversal.
pub const MISSING_VALUE: f64 = 0.0;

/// Replace NaN with [`MISSING_VALUE`]; other values pass through.
#[inline]
pub fn normalize_value(value: f64) -> f64 {
    if value.is_nan() { MISSING_VALUE } else { value }
}

// ============================================================================
// BinMapper
// ============================================================================

/// Bin boundaries of one numerical feature.
///
/// Value `v` maps to the first bin whose upper bound satisfies `v <= bound`.
/// The last bound is `f64::MAX`, so every finite value has a bin; `+inf`
/// clamps into the last bin and `-inf` into bin 0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BinMapper {
    bin_upper_bounds: Box<[f64]>,
    min_val: f64,
    max_val: f64,
}

impl BinMapper {
    /// Create from strictly increasing upper bounds ending in `f64::MAX`.
    pub fn numerical(bin_upper_bounds: Vec<f64>, min_val: f64, max_val: f64) -> Self {
        debug_assert!(!bin_upper_bounds.is_empty());
        debug_assert!(bin_upper_bounds.windows(2).all(|w| w[0] < w[1]));
        Self {
            bin_upper_bounds: bin_upper_bounds.into_boxed_slice(),
            min_val,
            max_val,
        }
    }

    /// Single-bin mapper for constant or empty columns.
    pub fn trivial(value: f64) -> Self {
        Self::numerical(vec![f64::MAX], value, value)
    }

    /// Non-empty, strictly increasing and ending in `f64::MAX`.
    ///
    /// Always true for mappers built in-process; checked on decoded ones.
    pub fn is_well_formed(&self) -> bool {
        let bounds = &self.bin_upper_bounds;
        bounds.last() == Some(&f64::MAX) && bounds.windows(2).all(|w| w[0] < w[1])
    }

    #[inline]
    pub fn n_bins(&self) -> u32 {
        self.bin_upper_bounds.len() as u32
    }

    /// A feature with one bin can never be split.
    #[inline]
    pub fn is_trivial(&self) -> bool {
        self.bin_upper_bounds.len() <= 1
    }

    #[inline]
    pub fn upper_bounds(&self) -> &[f64] {
        &self.bin_upper_bounds
    }

    /// Smallest finite value observed while building the bins.
    pub fn min_val(&self) -> f64 {
        self.min_val
    }

    /// Largest finite value observed while building the bins.
    pub fn max_val(&self) -> f64 {
        self.max_val
    }

    #[inline]
    pub fn value_to_bin(&self, value: f64) -> u32 {
        let value = normalize_value(value);
        let bounds = &self.bin_upper_bounds;
        let mut lo = 0usize;
        let mut hi = bounds.len() - 1;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if value <= bounds[mid] {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo as u32
    }

    /// Upper bound of a bin, used as the split threshold for `bin <= split_bin`.
    #[inline]
    pub fn bin_to_value(&self, bin: u32) -> f64 {
        self.bin_upper_bounds[bin as usize]
    }
}

// ============================================================================
// BinTable
// ============================================================================

/// Bin boundaries of every feature of a dataset.
///
/// Shared read-only (behind an `Arc`) between a reference dataset and the
/// datasets binned against it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BinTable {
    mappers: Vec<BinMapper>,
}

impl BinTable {
    pub fn new(mappers: Vec<BinMapper>) -> Self {
        Self { mappers }
    }

    pub fn n_features(&self) -> usize {
        self.mappers.len()
    }

    #[inline]
    pub fn mapper(&self, feature: usize) -> &BinMapper {
        &self.mappers[feature]
    }

    pub fn mappers(&self) -> &[BinMapper] {
        &self.mappers
    }

    /// Total number of bins across features.
    pub fn total_bins(&self) -> usize {
        self.mappers.iter().map(|m| m.n_bins() as usize).sum()
    }

    /// Histogram offset of each feature, plus the total as last entry.
    pub fn bin_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.mappers.len() + 1);
        let mut acc = 0usize;
        offsets.push(0);
        for m in &self.mappers {
            acc += m.n_bins() as usize;
            offsets.push(acc);
        }
        offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_mapper() -> BinMapper {
        BinMapper::numerical(vec![1.5, 2.5, 3.5, f64::MAX], 1.0, 4.0)
    }

    #[test]
    fn value_to_bin_boundaries() {
        let m = make_mapper();
        assert_eq!(m.value_to_bin(1.0), 0);
        assert_eq!(m.value_to_bin(1.5), 0);
        assert_eq!(m.value_to_bin(1.6), 1);
        assert_eq!(m.value_to_bin(2.5), 1);
        assert_eq!(m.value_to_bin(3.0), 2);
        assert_eq!(m.value_to_bin(4.0), 3);
    }

    #[test]
    fn out_of_range_values_clamp() {
        let m = make_mapper();
        assert_eq!(m.value_to_bin(-100.0), 0);
        assert_eq!(m.value_to_bin(f64::NEG_INFINITY), 0);
        assert_eq!(m.value_to_bin(1e300), 3);
        assert_eq!(m.value_to_bin(f64::INFINITY), 3);
    }

    #[test]
    fn nan_bins_like_zero() {
        let m = make_mapper();
        assert_eq!(m.value_to_bin(f64::NAN), m.value_to_bin(0.0));
    }

    #[test]
    fn bin_to_value_is_upper_bound() {
        let m = make_mapper();
        for bin in 0..m.n_bins() {
            assert_eq!(m.value_to_bin(m.bin_to_value(bin)), bin);
        }
    }

    #[test]
    fn trivial_mapper() {
        let m = BinMapper::trivial(7.0);
        assert!(m.is_trivial());
        assert_eq!(m.value_to_bin(-1.0), 0);
        assert_eq!(m.value_to_bin(1e9), 0);
    }

    #[test]
    fn table_offsets() {
        let table = BinTable::new(vec![make_mapper(), BinMapper::trivial(0.0)]);
        assert_eq!(table.total_bins(), 5);
        assert_eq!(table.bin_offsets(), vec![0, 4, 5]);
    }
}
