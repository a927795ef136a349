//! Split gain and best-split search over histograms.

use super::histograms::{Histogram, HistogramBin};
use crate::config::RegularizationParams;
use crate::data::BinTable;
use crate::utils::Parallelism;

/// Hessian floor added to denominators.
const EPSILON: f64 = 1e-15;

// =============================================================================
// Gain Parameters
// =============================================================================

/// Regularization and constraints for gain and leaf value computation.
#[derive(Clone, Debug)]
pub struct GainParams {
    /// L2 regularization (lambda).
    pub lambda_l2: f64,
    /// L1 regularization (alpha).
    pub lambda_l1: f64,
    pub min_gain_to_split: f64,
    /// Minimum hessian sum per child.
    pub min_sum_hessian: f64,
    /// Minimum rows per child.
    pub min_data_in_leaf: u32,
}

impl Default for GainParams {
    fn default() -> Self {
        Self::from(&RegularizationParams::default())
    }
}

impl From<&RegularizationParams> for GainParams {
    fn from(params: &RegularizationParams) -> Self {
        Self {
            lambda_l2: params.lambda_l2,
            lambda_l1: params.lambda_l1,
            min_gain_to_split: params.min_gain_to_split,
            min_sum_hessian: params.min_sum_hessian_in_leaf,
            min_data_in_leaf: params.min_data_in_leaf,
        }
    }
}

impl GainParams {
    /// `sign(G) * max(0, |G| - alpha)`.
    #[inline]
    fn threshold_l1(&self, grad: f64) -> f64 {
        if self.lambda_l1 == 0.0 {
            grad
        } else {
            grad.signum() * (grad.abs() - self.lambda_l1).max(0.0)
        }
    }

    /// Leaf score `T(G)^2 / (H + lambda)`.
    #[inline]
    pub fn leaf_score(&self, grad: f64, hess: f64) -> f64 {
        let g = self.threshold_l1(grad);
        g * g / (hess + self.lambda_l2 + EPSILON)
    }

    /// ```text
    /// gain = 0.5 * [S(G_L, H_L) + S(G_R, H_R) - S(G_P, H_P)] - min_gain_to_split
    /// ```
    #[inline]
    pub fn split_gain(&self, left: &SideSums, right: &SideSums, parent: &SideSums) -> f64 {
        0.5 * (self.leaf_score(left.grad, left.hess) + self.leaf_score(right.grad, right.hess)
            - self.leaf_score(parent.grad, parent.hess))
            - self.min_gain_to_split
    }

    #[inline]
    pub fn is_valid_split(&self, left: &SideSums, right: &SideSums) -> bool {
        left.count >= self.min_data_in_leaf
            && right.count >= self.min_data_in_leaf
            && left.hess >= self.min_sum_hessian
            && right.hess >= self.min_sum_hessian
    }

    /// Newton step with L1 soft thresholding: `-T(G) / (H + lambda)`.
    #[inline]
    pub fn leaf_output(&self, grad: f64, hess: f64) -> f64 {
        -self.threshold_l1(grad) / (hess + self.lambda_l2 + EPSILON)
    }
}

// =============================================================================
// Split search
// =============================================================================

/// Gradient, hessian and row totals of a node or one side of a split.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SideSums {
    pub grad: f64,
    pub hess: f64,
    pub count: u32,
}

impl SideSums {
    #[inline]
    fn add(&mut self, bin: &HistogramBin) {
        self.grad += bin.grad;
        self.hess += bin.hess;
        self.count += bin.count;
    }

    #[inline]
    fn minus(&self, other: &SideSums) -> SideSums {
        SideSums {
            grad: self.grad - other.grad,
            hess: self.hess - other.hess,
            count: self.count - other.count,
        }
    }
}

/// Best split of one leaf: rows with `bin <= bin` go left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitInfo {
    pub feature: u32,
    pub bin: u32,
    pub gain: f64,
    pub left: SideSums,
    pub right: SideSums,
}

/// Best split over all features, `None` when no split has positive gain.
///
/// Ties go to the lowest feature, then the lowest bin.
pub fn find_best_split(
    histogram: &Histogram,
    offsets: &[usize],
    bin_table: &BinTable,
    parent: &SideSums,
    params: &GainParams,
    parallelism: Parallelism,
) -> Option<SplitInfo> {
    let per_feature = parallelism.map_range(bin_table.n_features(), |f| {
        if bin_table.mapper(f).is_trivial() {
            return None;
        }
        best_split_for_feature(f as u32, histogram.feature(offsets, f), parent, params)
    });

    per_feature
        .into_iter()
        .flatten()
        .fold(None, |best: Option<SplitInfo>, candidate| match best {
            Some(b) if b.gain >= candidate.gain => Some(b),
            _ => Some(candidate),
        })
}

fn best_split_for_feature(
    feature: u32,
    bins: &[HistogramBin],
    parent: &SideSums,
    params: &GainParams,
) -> Option<SplitInfo> {
    let mut best: Option<SplitInfo> = None;
    let mut left = SideSums::default();
    // The last bin cannot be a threshold: nothing would go right
    for (bin, stats) in bins.iter().enumerate().take(bins.len().saturating_sub(1)) {
        left.add(stats);
        let right = parent.minus(&left);
        if left.count < params.min_data_in_leaf || left.hess < params.min_sum_hessian {
            continue;
        }
        if right.count < params.min_data_in_leaf || right.hess < params.min_sum_hessian {
            break;
        }
        let gain = params.split_gain(&left, &right, parent);
        if gain > 0.0 && best.is_none_or(|b| gain > b.gain) {
            best = Some(SplitInfo {
                feature,
                bin: bin as u32,
                gain,
                left,
                right,
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{BinColumn, BinMapper};
    use crate::training::GradsTuple;
    use approx::assert_abs_diff_eq;

    fn params(min_data_in_leaf: u32) -> GainParams {
        GainParams {
            min_data_in_leaf,
            min_sum_hessian: 0.0,
            ..GainParams::default()
        }
    }

    #[test]
    fn gain_of_symmetric_split() {
        let p = GainParams::default();
        let left = SideSums { grad: 10.0, hess: 5.0, count: 5 };
        let right = SideSums { grad: -10.0, hess: 5.0, count: 5 };
        let parent = SideSums { grad: 0.0, hess: 10.0, count: 10 };
        assert_abs_diff_eq!(p.split_gain(&left, &right, &parent), 20.0, epsilon = 1e-9);
    }

    #[test]
    fn l1_soft_thresholds_leaf_output() {
        let p = GainParams {
            lambda_l1: 1.0,
            lambda_l2: 1.0,
            ..GainParams::default()
        };
        assert_abs_diff_eq!(p.leaf_output(3.0, 1.0), -1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.leaf_output(-3.0, 1.0), 1.0, epsilon = 1e-9);
        assert_eq!(p.leaf_output(0.5, 1.0), 0.0);
    }

    #[test]
    fn validity_constraints() {
        let p = GainParams {
            min_data_in_leaf: 3,
            min_sum_hessian: 1.0,
            ..GainParams::default()
        };
        let ok = SideSums { grad: 0.0, hess: 3.0, count: 3 };
        let few = SideSums { grad: 0.0, hess: 3.0, count: 2 };
        let light = SideSums { grad: 0.0, hess: 0.5, count: 3 };
        assert!(p.is_valid_split(&ok, &ok));
        assert!(!p.is_valid_split(&few, &ok));
        assert!(!p.is_valid_split(&ok, &light));
    }

    /// Feature 0 separates the gradients perfectly, feature 1 is noise.
    fn histogram() -> (Histogram, Vec<usize>, BinTable, SideSums) {
        let mapper = BinMapper::numerical(vec![0.5, 1.5, 2.5, f64::MAX], 0.0, 3.0);
        let columns = vec![
            BinColumn::from_values(&mapper, &[0.0, 1.0, 2.0, 3.0, 0.0, 1.0, 2.0, 3.0]),
            BinColumn::from_values(&mapper, &[0.0, 0.0, 3.0, 3.0, 3.0, 3.0, 0.0, 0.0]),
        ];
        let grads: Vec<GradsTuple> = [-1.0f32, -1.0, 1.0, 1.0, -1.0, -1.0, 1.0, 1.0]
            .iter()
            .map(|&g| GradsTuple { grad: g, hess: 1.0 })
            .collect();
        let table = BinTable::new(vec![mapper.clone(), mapper]);
        let offsets = table.bin_offsets();
        let rows: Vec<u32> = (0..8).collect();
        let hist = Histogram::build(&offsets, &columns, &rows, &grads, Parallelism::Sequential);
        let parent = SideSums { grad: 0.0, hess: 8.0, count: 8 };
        (hist, offsets, table, parent)
    }

    #[test]
    fn finds_separating_split() {
        let (hist, offsets, table, parent) = histogram();
        let split = find_best_split(&hist, &offsets, &table, &parent, &params(1), Parallelism::Sequential)
            .unwrap();
        assert_eq!((split.feature, split.bin), (0, 1));
        assert_eq!(split.left.count, 4);
        assert_eq!(split.right.count, 4);
        assert_abs_diff_eq!(split.left.grad, -4.0);
        assert!(split.gain > 0.0);
    }

    #[test]
    fn respects_min_data_in_leaf() {
        let (hist, offsets, table, parent) = histogram();
        assert!(
            find_best_split(&hist, &offsets, &table, &parent, &params(5), Parallelism::Sequential)
                .is_none()
        );
    }

    #[test]
    fn min_gain_blocks_split() {
        let (hist, offsets, table, parent) = histogram();
        let strict = GainParams {
            min_gain_to_split: 1e6,
            ..params(1)
        };
        assert!(find_best_split(&hist, &offsets, &table, &parent, &strict, Parallelism::Sequential).is_none());
    }
}
