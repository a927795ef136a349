//! Metric evaluation during training.
//!
//! [`Evaluator`] turns raw scores into the space each metric expects and
//! computes [`MetricValue`]s for one dataset at a time.

use super::metrics::{Metric, MetricFn};
use super::objectives::{Objective, ObjectiveFn, PredictionKind};

// =============================================================================
// MetricValue
// =============================================================================

/// A computed metric value with its name and direction.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricValue {
    pub name: String,
    pub value: f64,
    pub higher_is_better: bool,
}

impl MetricValue {
    pub fn new(name: impl Into<String>, value: f64, higher_is_better: bool) -> Self {
        Self {
            name: name.into(),
            value,
            higher_is_better,
        }
    }

    /// Returns true if this value is strictly better than `other_value`.
    pub fn is_better_than_value(&self, other_value: f64) -> bool {
        if self.higher_is_better {
            self.value > other_value
        } else {
            self.value < other_value
        }
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:.6}", self.name, self.value)
    }
}

// =============================================================================
// Evaluator
// =============================================================================

/// Computes the configured metrics from raw scores.
///
/// Holds a reusable buffer for transformed predictions so that each round
/// allocates at most once per dataset size.
pub struct Evaluator<'a> {
    objective: &'a Objective,
    metrics: &'a [Metric],
    transform_buffer: Vec<f64>,
}

impl<'a> Evaluator<'a> {
    pub fn new(objective: &'a Objective, metrics: &'a [Metric]) -> Self {
        Self {
            objective,
            metrics,
            transform_buffer: Vec::new(),
        }
    }

    /// Evaluate every metric on one dataset.
    pub fn evaluate(
        &mut self,
        raw_scores: &[f64],
        labels: &[f32],
        weights: Option<&[f32]>,
    ) -> Vec<MetricValue> {
        let mut transformed = false;
        let mut values = Vec::with_capacity(self.metrics.len());
        for metric in self.metrics {
            let predictions: &[f64] = match metric.expected_prediction_kind() {
                PredictionKind::Margin => raw_scores,
                _ => {
                    if !transformed {
                        self.transform_buffer.clear();
                        self.transform_buffer
                            .extend(raw_scores.iter().map(|&s| self.objective.transform(s)));
                        transformed = true;
                    }
                    &self.transform_buffer
                }
            };
            values.push(MetricValue::new(
                metric.name(),
                metric.compute(predictions, labels, weights),
                metric.higher_is_better(),
            ));
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn metric_value_display_and_direction() {
        let auc = MetricValue::new("auc", 0.8123456, true);
        assert_eq!(auc.to_string(), "auc: 0.812346");
        assert!(auc.is_better_than_value(0.8));

        let loss = MetricValue::new("binary_logloss", 0.3, false);
        assert!(loss.is_better_than_value(0.4));
        assert!(!loss.is_better_than_value(0.3));
    }

    #[test]
    fn evaluator_transforms_only_for_probability_metrics() {
        let objective = Objective::logistic();
        let metrics = [Metric::auc(), Metric::log_loss()];
        let mut evaluator = Evaluator::new(&objective, &metrics);

        let scores = [0.0, 0.0];
        let labels = [0.0, 1.0];
        let values = evaluator.evaluate(&scores, &labels, None);

        assert_eq!(values.len(), 2);
        assert_eq!(values[0].name, "auc");
        assert_abs_diff_eq!(values[0].value, 0.5);
        // sigmoid(0) = 0.5 for both rows
        assert_abs_diff_eq!(values[1].value, 2.0f64.ln(), epsilon = 1e-12);
    }
}
