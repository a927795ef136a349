//! Evaluation metrics for model quality.
//!
//! Metrics are separate from objectives: a model trained with logistic loss
//! may be monitored with AUC, error rate, or both.
//!
//! All metrics accept optional sample weights; when `None`, every row has
//! weight 1.
//!
//! # Available Metrics
//!
//! ## Classification
//! - [`Auc`]: area under the ROC curve (`auc`)
//! - [`LogLoss`]: binary cross-entropy (`binary_logloss`)
//! - [`BinaryError`]: misclassification rate at 0.5 (`binary_error`)
//!
//! ## Regression
//! - [`L2`]: mean squared error (`l2`)
//! - [`Rmse`]: root mean squared error (`rmse`)
//! - [`L1`]: mean absolute error (`l1`)

mod classification;
mod regression;

pub use classification::{Auc, BinaryError, LogLoss};
pub use regression::{L1, L2, Rmse};

use super::objectives::PredictionKind;

// =============================================================================
// Metric Trait
// =============================================================================

/// A metric computed over all rows of one dataset.
pub trait MetricFn: Send + Sync {
    /// Compute the metric. `predictions` are in the space reported by
    /// [`expected_prediction_kind`](Self::expected_prediction_kind).
    fn compute(&self, predictions: &[f64], labels: &[f32], weights: Option<&[f32]>) -> f64;

    /// Whether larger values mean a better model.
    fn higher_is_better(&self) -> bool;

    /// Prediction space this metric expects. `Margin` means raw scores;
    /// anything else means the objective's transformed output.
    fn expected_prediction_kind(&self) -> PredictionKind;

    /// Name used in parameter strings and logs.
    fn name(&self) -> &'static str;
}

// =============================================================================
// Metric Enum
// =============================================================================

/// Evaluation metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Auc(Auc),
    LogLoss(LogLoss),
    BinaryError(BinaryError),
    L2(L2),
    Rmse(Rmse),
    L1(L1),
}

impl Metric {
    pub fn auc() -> Self {
        Metric::Auc(Auc)
    }

    pub fn log_loss() -> Self {
        Metric::LogLoss(LogLoss)
    }

    pub fn binary_error() -> Self {
        Metric::BinaryError(BinaryError)
    }

    pub fn l2() -> Self {
        Metric::L2(L2)
    }

    pub fn rmse() -> Self {
        Metric::Rmse(Rmse)
    }

    pub fn l1() -> Self {
        Metric::L1(L1)
    }

    /// Resolve a metric name or alias. Returns `None` for unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "auc" => Some(Metric::auc()),
            "binary_logloss" | "logloss" | "binary" => Some(Metric::log_loss()),
            "binary_error" => Some(Metric::binary_error()),
            "l2" | "mse" | "mean_squared_error" | "regression" => Some(Metric::l2()),
            "rmse" | "l2_root" | "root_mean_squared_error" => Some(Metric::rmse()),
            "l1" | "mae" | "mean_absolute_error" => Some(Metric::l1()),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn MetricFn {
        match self {
            Metric::Auc(m) => m,
            Metric::LogLoss(m) => m,
            Metric::BinaryError(m) => m,
            Metric::L2(m) => m,
            Metric::Rmse(m) => m,
            Metric::L1(m) => m,
        }
    }
}

impl MetricFn for Metric {
    fn compute(&self, predictions: &[f64], labels: &[f32], weights: Option<&[f32]>) -> f64 {
        self.inner().compute(predictions, labels, weights)
    }

    fn higher_is_better(&self) -> bool {
        self.inner().higher_is_better()
    }

    fn expected_prediction_kind(&self) -> PredictionKind {
        self.inner().expected_prediction_kind()
    }

    fn name(&self) -> &'static str {
        self.inner().name()
    }
}

/// Weighted mean of a per-row quantity; 0 for empty input.
pub(crate) fn weighted_mean(
    n_rows: usize,
    weights: Option<&[f32]>,
    per_row: impl Fn(usize) -> f64,
) -> f64 {
    let (sum, total) = (0..n_rows).fold((0.0f64, 0.0f64), |(sum, total), i| {
        let w = weights.map_or(1.0, |w| w[i] as f64);
        (sum + w * per_row(i), total + w)
    });
    if total > 0.0 { sum / total } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("auc", "auc", true)]
    #[case("binary_logloss", "binary_logloss", false)]
    #[case("logloss", "binary_logloss", false)]
    #[case("binary_error", "binary_error", false)]
    #[case("mse", "l2", false)]
    #[case("l2_root", "rmse", false)]
    #[case("mae", "l1", false)]
    fn metric_from_name(#[case] alias: &str, #[case] name: &str, #[case] higher: bool) {
        let metric = Metric::from_name(alias).unwrap();
        assert_eq!(metric.name(), name);
        assert_eq!(metric.higher_is_better(), higher);
    }

    #[test]
    fn unknown_metric_name() {
        assert!(Metric::from_name("ndcg").is_none());
    }

    #[test]
    fn weighted_mean_handles_zero_weights() {
        assert_eq!(weighted_mean(2, Some(&[0.0, 0.0]), |_| 1.0), 0.0);
        assert_eq!(weighted_mean(2, Some(&[1.0, 3.0]), |i| i as f64), 0.75);
    }
}
