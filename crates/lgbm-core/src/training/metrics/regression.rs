//! Regression metrics.

use super::{MetricFn, weighted_mean};
use crate::training::objectives::PredictionKind;

/// Mean squared error.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct L2;

impl MetricFn for L2 {
    fn compute(&self, predictions: &[f64], labels: &[f32], weights: Option<&[f32]>) -> f64 {
        weighted_mean(predictions.len(), weights, |i| {
            let d = predictions[i] - labels[i] as f64;
            d * d
        })
    }

    fn higher_is_better(&self) -> bool {
        false
    }

    fn expected_prediction_kind(&self) -> PredictionKind {
        PredictionKind::Value
    }

    fn name(&self) -> &'static str {
        "l2"
    }
}

/// Root mean squared error.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rmse;

impl MetricFn for Rmse {
    fn compute(&self, predictions: &[f64], labels: &[f32], weights: Option<&[f32]>) -> f64 {
        L2.compute(predictions, labels, weights).sqrt()
    }

    fn higher_is_better(&self) -> bool {
        false
    }

    fn expected_prediction_kind(&self) -> PredictionKind {
        PredictionKind::Value
    }

    fn name(&self) -> &'static str {
        "rmse"
    }
}

/// Mean absolute error.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct L1;

impl MetricFn for L1 {
    fn compute(&self, predictions: &[f64], labels: &[f32], weights: Option<&[f32]>) -> f64 {
        weighted_mean(predictions.len(), weights, |i| {
            (predictions[i] - labels[i] as f64).abs()
        })
    }

    fn higher_is_better(&self) -> bool {
        false
    }

    fn expected_prediction_kind(&self) -> PredictionKind {
        PredictionKind::Value
    }

    fn name(&self) -> &'static str {
        "l1"
    }
}
