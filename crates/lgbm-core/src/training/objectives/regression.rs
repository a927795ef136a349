//! Regression objectives.

use super::{ObjectiveFn, PredictionKind, weight_iter};
use crate::training::gradients::GradsTuple;
use crate::training::metrics::Metric;

/// Squared error loss: `0.5 * w * (score - y)^2`.
///
/// grad = w * (score - y), hess = w.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SquaredLoss;

impl ObjectiveFn for SquaredLoss {
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

        for (i, w) in weight_iter(weights, n_rows).enumerate() {
            grad_hess[i].grad = (w as f64 * (scores[i] - labels[i] as f64)) as f32;
            grad_hess[i].hess = w;
        }
    }

    /// Weighted mean of the labels.
    fn base_score(&self, labels: &[f32], weights: Option<&[f32]>) -> f64 {
        let (sum, total) = labels
            .iter()
            .zip(weight_iter(weights, labels.len()))
            .fold((0.0f64, 0.0f64), |(sum, total), (&y, w)| {
                (sum + y as f64 * w as f64, total + w as f64)
            });
        if total > 0.0 { sum / total } else { 0.0 }
    }

    fn transform(&self, raw: f64) -> f64 {
        raw
    }

    fn transformed_kind(&self) -> PredictionKind {
        PredictionKind::Value
    }

    fn check_labels(&self, labels: &[f32]) -> Result<(), String> {
        match labels.iter().position(|y| !y.is_finite()) {
            None => Ok(()),
            Some(row) => Err(format!("label at row {row} is not finite")),
        }
    }

    fn default_metric(&self) -> Metric {
        Metric::l2()
    }

    fn name(&self) -> &'static str {
        "regression"
    }

    fn model_string(&self) -> String {
        "regression".to_string()
    }
}
