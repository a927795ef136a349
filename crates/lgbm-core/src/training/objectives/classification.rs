//! Binary classification objective.

use super::{ObjectiveFn, PredictionKind, weight_iter};
use crate::training::gradients::GradsTuple;
use crate::training::metrics::Metric;

/// Floor for hessians so leaf weights stay finite on saturated rows.
const HESS_MIN: f64 = 1e-6;

/// Clamp for the positive rate when computing the base score.
const PROB_EPS: f64 = 1e-7;

/// Logistic loss for labels in {0, 1}.
///
/// With sigmoid scale `s` and `p = 1 / (1 + exp(-s * score))`:
/// - grad = w * s * (p - y)
/// - hess = w * s^2 * p * (1 - p)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticLoss {
    pub sigmoid: f64,
}

impl Default for LogisticLoss {
    fn default() -> Self {
        Self { sigmoid: 1.0 }
    }
}

impl LogisticLoss {
    pub fn new(sigmoid: f64) -> Self {
        Self { sigmoid }
    }

    #[inline]
    fn probability(&self, raw: f64) -> f64 {
        1.0 / (1.0 + (-self.sigmoid * raw).exp())
    }
}

impl ObjectiveFn for LogisticLoss {
    fn compute_gradients(
        &self,
        scores: &[f64],
        labels: &[f32],
        weights: Option<&[f32]>,
        grad_hess: &mut [GradsTuple],
    ) {
        let n_rows = scores.len();
        debug_assert!(labels.len() >= n_rows);
        debug_assert!(grad_hess.len() >= n_rows);

        let s = self.sigmoid;
        for (i, w) in weight_iter(weights, n_rows).enumerate() {
            let w = w as f64;
            let p = self.probability(scores[i]);
            grad_hess[i].grad = (w * s * (p - labels[i] as f64)) as f32;
            grad_hess[i].hess = (w * s * s * p * (1.0 - p)).max(HESS_MIN) as f32;
        }
    }

    fn base_score(&self, labels: &[f32], weights: Option<&[f32]>) -> f64 {
        if labels.is_empty() {
            return 0.0;
        }
        let (pos, total) = labels
            .iter()
            .zip(weight_iter(weights, labels.len()))
            .fold((0.0f64, 0.0f64), |(pos, total), (&y, w)| {
                (pos + y as f64 * w as f64, total + w as f64)
            });
        if total <= 0.0 {
            return 0.0;
        }
        let p = (pos / total).clamp(PROB_EPS, 1.0 - PROB_EPS);
        (p / (1.0 - p)).ln() / self.sigmoid
    }

    fn transform(&self, raw: f64) -> f64 {
        self.probability(raw)
    }

    fn transformed_kind(&self) -> PredictionKind {
        PredictionKind::Probability
    }

    fn check_labels(&self, labels: &[f32]) -> Result<(), String> {
        match labels.iter().position(|&y| y != 0.0 && y != 1.0) {
            None => Ok(()),
            Some(row) => Err(format!(
                "binary objective expects labels in {{0, 1}}, found {} at row {row}",
                labels[row]
            )),
        }
    }

    fn default_metric(&self) -> Metric {
        Metric::log_loss()
    }

    fn name(&self) -> &'static str {
        "binary"
    }

    fn model_string(&self) -> String {
        format!("binary sigmoid:{}", self.sigmoid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn logistic_gradient_at_zero() {
        let obj = LogisticLoss::default();
        let mut grad_hess = [GradsTuple::default(); 2];
        obj.compute_gradients(&[0.0, 0.0], &[1.0, 0.0], None, &mut grad_hess);

        // sigmoid(0) = 0.5
        assert_abs_diff_eq!(grad_hess[0].grad, -0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(grad_hess[1].grad, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(grad_hess[0].hess, 0.25, epsilon = 1e-6);
    }

    #[test]
    fn logistic_gradient_weighted_and_scaled() {
        let obj = LogisticLoss::new(2.0);
        let mut grad_hess = [GradsTuple::default()];
        obj.compute_gradients(&[0.0], &[1.0], Some(&[3.0]), &mut grad_hess);

        // w * s * (p - y) = 3 * 2 * -0.5
        assert_abs_diff_eq!(grad_hess[0].grad, -3.0, epsilon = 1e-6);
        // w * s^2 * p(1-p) = 3 * 4 * 0.25
        assert_abs_diff_eq!(grad_hess[0].hess, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn logistic_hessian_is_floored() {
        let obj = LogisticLoss::default();
        let mut grad_hess = [GradsTuple::default()];
        obj.compute_gradients(&[60.0], &[1.0], None, &mut grad_hess);
        assert!(grad_hess[0].hess >= HESS_MIN as f32);
    }

    #[test]
    fn logistic_base_score() {
        let obj = LogisticLoss::default();
        assert_abs_diff_eq!(obj.base_score(&[0.0, 0.0, 1.0, 1.0], None), 0.0, epsilon = 1e-12);

        // 3 of 4 positive: log(0.75 / 0.25) = ln 3
        let score = obj.base_score(&[0.0, 1.0, 1.0, 1.0], None);
        assert_abs_diff_eq!(score, 3.0f64.ln(), epsilon = 1e-12);

        // Weighted: positive weight 1, negative weight 3
        let score = obj.base_score(&[1.0, 0.0], Some(&[1.0, 3.0]));
        assert_abs_diff_eq!(score, (1.0f64 / 3.0).ln(), epsilon = 1e-12);
    }

    #[test]
    fn logistic_base_score_all_one_class_is_finite() {
        let obj = LogisticLoss::default();
        assert!(obj.base_score(&[1.0, 1.0], None).is_finite());
        assert!(obj.base_score(&[0.0, 0.0], None).is_finite());
    }

    #[test]
    fn logistic_transform_matches_base_rate() {
        let obj = LogisticLoss::new(1.5);
        let base = obj.base_score(&[0.0, 1.0, 1.0, 1.0], None);
        assert_abs_diff_eq!(obj.transform(base), 0.75, epsilon = 1e-9);
    }

    #[test]
    fn logistic_rejects_non_binary_labels() {
        let obj = LogisticLoss::default();
        assert!(obj.check_labels(&[0.0, 1.0, 1.0]).is_ok());
        let err = obj.check_labels(&[0.0, 2.0]).unwrap_err();
        assert!(err.contains("row 1"));
    }
}
