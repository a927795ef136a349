//! Objective (loss) functions for gradient boosting.
//!
//! Objectives compute per-row gradients and hessians, the optimal constant
//! score used to start boosting, and the transform that turns raw scores into
//! the objective's natural output space.
//!
//! # Available Objectives
//!
//! - [`SquaredLoss`]: regression (L2), `objective=regression`
//! - [`LogisticLoss`]: binary classification, `objective=binary`

mod classification;
mod regression;

pub use classification::LogisticLoss;
pub use regression::SquaredLoss;

use super::gradients::GradsTuple;
use super::metrics::Metric;

/// Semantic kind of a prediction value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionKind {
    /// Raw additive score (log-odds for binary).
    Margin,
    /// Probability in [0, 1].
    Probability,
    /// Regression value.
    Value,
}

// =============================================================================
// Objective Trait
// =============================================================================

/// A loss function for single-output boosting.
///
/// Pass `None` for `weights` for unweighted training.
pub trait ObjectiveFn: Send + Sync {
    /// Compute gradient/hessian pairs for the current raw scores.
    fn compute_gradients(
        &self,
        scores: &[f64],
        labels: &[f32],
        weights: Option<&[f32]>,
        grad_hess: &mut [GradsTuple],
    );

    /// The optimal constant raw score before any tree is added.
    fn base_score(&self, labels: &[f32], weights: Option<&[f32]>) -> f64;

    /// Transform one raw score into the objective's output space.
    fn transform(&self, raw: f64) -> f64;

    /// Kind of values produced by [`transform`](Self::transform).
    fn transformed_kind(&self) -> PredictionKind;

    /// Check that labels are acceptable, returning a description of the
    /// first offending label.
    fn check_labels(&self, labels: &[f32]) -> Result<(), String>;

    /// Metric used when none is configured.
    fn default_metric(&self) -> Metric;

    /// Name used in configuration strings.
    fn name(&self) -> &'static str;

    /// Objective line written into text models, e.g. `binary sigmoid:1`.
    fn model_string(&self) -> String;
}

#[inline]
pub(crate) fn weight_iter(weights: Option<&[f32]>, n_rows: usize) -> impl Iterator<Item = f32> + '_ {
    (0..n_rows).map(move |i| weights.map_or(1.0, |w| w[i]))
}

// =============================================================================
// Objective Enum
// =============================================================================

/// Objective function enum used by the booster and the model format.
#[derive(Debug, Clone, PartialEq)]
pub enum Objective {
    /// Squared error loss (L2) for regression.
    SquaredLoss(SquaredLoss),
    /// Logistic loss for binary classification.
    LogisticLoss(LogisticLoss),
}

impl Default for Objective {
    fn default() -> Self {
        Objective::squared()
    }
}

impl Objective {
    pub fn squared() -> Self {
        Objective::SquaredLoss(SquaredLoss)
    }

    pub fn logistic() -> Self {
        Objective::LogisticLoss(LogisticLoss::default())
    }

    pub fn logistic_with_sigmoid(sigmoid: f64) -> Self {
        Objective::LogisticLoss(LogisticLoss::new(sigmoid))
    }

    /// Resolve an objective name as accepted in parameter strings.
    ///
    /// Returns `None` for unknown names.
    pub fn from_name(name: &str, sigmoid: f64) -> Option<Self> {
        match name {
            "regression" | "regression_l2" | "l2" | "mean_squared_error" | "mse" => {
                Some(Objective::squared())
            }
            "binary" => Some(Objective::logistic_with_sigmoid(sigmoid)),
            _ => None,
        }
    }

    /// Parse the `objective=` line of a text model, e.g. `binary sigmoid:2`.
    pub fn from_model_string(s: &str) -> Option<Self> {
        let mut parts = s.split_whitespace();
        match parts.next()? {
            "binary" => {
                let mut sigmoid = 1.0;
                for part in parts {
                    if let Some(v) = part.strip_prefix("sigmoid:") {
                        sigmoid = v.parse().ok()?;
                    }
                }
                Some(Objective::logistic_with_sigmoid(sigmoid))
            }
            "regression" | "regression_l2" => Some(Objective::squared()),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn ObjectiveFn {
        match self {
            Objective::SquaredLoss(inner) => inner,
            Objective::LogisticLoss(inner) => inner,
        }
    }
}

impl ObjectiveFn for Objective {
    fn compute_gradients(
        &self,
        scores: &[f64],
        labels: &[f32],
        weights: Option<&[f32]>,
        grad_hess: &mut [GradsTuple],
    ) {
        self.inner()
            .compute_gradients(scores, labels, weights, grad_hess)
    }

    fn base_score(&self, labels: &[f32], weights: Option<&[f32]>) -> f64 {
        self.inner().base_score(labels, weights)
    }

    fn transform(&self, raw: f64) -> f64 {
        self.inner().transform(raw)
    }

    fn transformed_kind(&self) -> PredictionKind {
        self.inner().transformed_kind()
    }

    fn check_labels(&self, labels: &[f32]) -> Result<(), String> {
        self.inner().check_labels(labels)
    }

    fn default_metric(&self) -> Metric {
        self.inner().default_metric()
    }

    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn model_string(&self) -> String {
        self.inner().model_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("regression", "regression")]
    #[case("mse", "regression")]
    #[case("l2", "regression")]
    #[case("binary", "binary")]
    fn objective_from_name(#[case] name: &str, #[case] expected: &str) {
        let obj = Objective::from_name(name, 1.0).unwrap();
        assert_eq!(obj.name(), expected);
    }

    #[test]
    fn unknown_objective_name() {
        assert!(Objective::from_name("lambdarank", 1.0).is_none());
    }

    #[test]
    fn model_string_round_trip() {
        let obj = Objective::logistic_with_sigmoid(2.0);
        let parsed = Objective::from_model_string(&obj.model_string()).unwrap();
        assert_eq!(parsed, obj);

        let obj = Objective::squared();
        assert_eq!(Objective::from_model_string(&obj.model_string()), Some(obj));
        assert!(Objective::from_model_string("multiclass num_class:3").is_none());
    }
}
