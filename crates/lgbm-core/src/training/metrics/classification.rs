//! Binary classification metrics.

use super::{MetricFn, weighted_mean};
use crate::training::objectives::PredictionKind;

// =============================================================================
// LogLoss
// =============================================================================

/// Binary cross-entropy: -mean(y*log(p) + (1-y)*log(1-p)).
///
/// Lower is better. Expects probabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LogLoss;

impl MetricFn for LogLoss {
    fn compute(&self, predictions: &[f64], labels: &[f32], weights: Option<&[f32]>) -> f64 {
        const EPS: f64 = 1e-15;
        weighted_mean(predictions.len(), weights, |i| {
            let p = predictions[i].clamp(EPS, 1.0 - EPS);
            let y = labels[i] as f64;
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
    }

    fn higher_is_better(&self) -> bool {
        false
    }

    fn expected_prediction_kind(&self) -> PredictionKind {
        PredictionKind::Probability
    }

    fn name(&self) -> &'static str {
        "binary_logloss"
    }
}

// =============================================================================
// BinaryError
// =============================================================================

/// Fraction of rows whose predicted class (probability > 0.5) differs from
/// the label.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BinaryError;

impl MetricFn for BinaryError {
    fn compute(&self, predictions: &[f64], labels: &[f32], weights: Option<&[f32]>) -> f64 {
        weighted_mean(predictions.len(), weights, |i| {
            let predicted_pos = predictions[i] > 0.5;
            let actual_pos = labels[i] > 0.5;
            if predicted_pos == actual_pos { 0.0 } else { 1.0 }
        })
    }

    fn higher_is_better(&self) -> bool {
        false
    }

    fn expected_prediction_kind(&self) -> PredictionKind {
        PredictionKind::Probability
    }

    fn name(&self) -> &'static str {
        "binary_error"
    }
}

// =============================================================================
// AUC
// =============================================================================

/// Area under the ROC curve.
///
/// Rank based, so it is computed on raw scores. Tied scores contribute half a
/// concordant pair. Returns 0.5 when only one class is present.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Auc;

impl MetricFn for Auc {
    fn compute(&self, predictions: &[f64], labels: &[f32], weights: Option<&[f32]>) -> f64 {
        compute_auc(predictions, labels, weights)
    }

    fn higher_is_better(&self) -> bool {
        true
    }

    fn expected_prediction_kind(&self) -> PredictionKind {
        PredictionKind::Margin
    }

    fn name(&self) -> &'static str {
        "auc"
    }
}

fn compute_auc(predictions: &[f64], labels: &[f32], weights: Option<&[f32]>) -> f64 {
    let n = predictions.len();
    let weight = |i: usize| weights.map_or(1.0, |w| w[i] as f64);

    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&a, &b| predictions[a].total_cmp(&predictions[b]));

    let (sum_pos, sum_neg) = (0..n).fold((0.0f64, 0.0f64), |(sp, sn), i| {
        if labels[i] > 0.5 {
            (sp + weight(i), sn)
        } else {
            (sp, sn + weight(i))
        }
    });

    if sum_pos <= 0.0 || sum_neg <= 0.0 {
        return 0.5;
    }

    // Ascending sweep over groups of tied scores: each positive beats every
    // negative seen so far and ties half of the negatives in its own group.
    let mut concordant = 0.0f64;
    let mut cumulative_neg = 0.0f64;
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && predictions[indices[j]] == predictions[indices[i]] {
            j += 1;
        }

        let (group_pos, group_neg) =
            indices[i..j]
                .iter()
                .fold((0.0f64, 0.0f64), |(gp, gn), &idx| {
                    if labels[idx] > 0.5 {
                        (gp + weight(idx), gn)
                    } else {
                        (gp, gn + weight(idx))
                    }
                });

        concordant += group_pos * (cumulative_neg + 0.5 * group_neg);
        cumulative_neg += group_neg;
        i = j;
    }

    (concordant / (sum_pos * sum_neg)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn auc_perfect_and_inverted() {
        let labels = [0.0, 0.0, 1.0, 1.0];
        assert_abs_diff_eq!(Auc.compute(&[0.1, 0.2, 0.8, 0.9], &labels, None), 1.0);
        assert_abs_diff_eq!(Auc.compute(&[0.9, 0.8, 0.2, 0.1], &labels, None), 0.0);
    }

    #[test]
    fn auc_all_tied_is_half() {
        let labels = [0.0, 1.0, 0.0, 1.0];
        assert_abs_diff_eq!(Auc.compute(&[0.3; 4], &labels, None), 0.5);
    }

    #[test]
    fn auc_partial_ordering() {
        // Pairs (pos, neg): (0.35 vs 0.1) win, (0.35 vs 0.4) lose,
        // (0.8 vs 0.1) win, (0.8 vs 0.4) win -> 3/4
        let preds = [0.1, 0.4, 0.35, 0.8];
        let labels = [0.0, 0.0, 1.0, 1.0];
        assert_abs_diff_eq!(Auc.compute(&preds, &labels, None), 0.75, epsilon = 1e-12);
    }

    #[test]
    fn auc_single_class_is_half() {
        assert_abs_diff_eq!(Auc.compute(&[0.1, 0.9], &[1.0, 1.0], None), 0.5);
    }

    #[test]
    fn auc_unit_weights_match_unweighted() {
        let preds = [0.1, 0.4, 0.35, 0.8, 0.35];
        let labels = [0.0, 0.0, 1.0, 1.0, 0.0];
        let weights = [1.0; 5];
        assert_abs_diff_eq!(
            Auc.compute(&preds, &labels, None),
            Auc.compute(&preds, &labels, Some(&weights)),
            epsilon = 1e-12
        );
    }

    #[test]
    fn auc_weights_change_result() {
        let preds = [0.1, 0.4, 0.35, 0.8];
        let labels = [0.0, 0.0, 1.0, 1.0];
        // Upweight the negative that beats the 0.35 positive.
        let weighted = Auc.compute(&preds, &labels, Some(&[1.0, 3.0, 1.0, 1.0]));
        assert!(weighted < 0.75);
    }

    #[test]
    fn logloss_known_value() {
        let preds = [0.5, 0.5];
        let labels = [0.0, 1.0];
        assert_abs_diff_eq!(LogLoss.compute(&preds, &labels, None), 2.0f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn logloss_is_finite_at_extremes() {
        let value = LogLoss.compute(&[0.0, 1.0], &[1.0, 0.0], None);
        assert!(value.is_finite());
        assert!(value > 30.0);
    }

    #[test]
    fn binary_error_counts_mistakes() {
        let preds = [0.2, 0.7, 0.6, 0.4];
        let labels = [0.0, 1.0, 0.0, 0.0];
        assert_abs_diff_eq!(BinaryError.compute(&preds, &labels, None), 0.25);
    }
}
