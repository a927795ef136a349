//! lgbm-core: a histogram gradient boosting engine behind a LightGBM-style C API.
//!
//! Data is binned once into a [`Dataset`]; a [`Booster`] grows leaf-wise
//! trees on the binned histograms round by round; the resulting [`Model`]
//! is written in LightGBM's v4 text format and applied to raw rows by a
//! [`Predictor`].
//!
//! # Key Types
//!
//! - [`Dataset`] - binned features plus label and weight fields
//! - [`Booster`] - training state machine and prediction entry point
//! - [`Model`] / [`Predictor`] - persisted ensemble and its application
//! - [`BoosterConfig`] / [`DatasetConfig`] / [`Params`] - configuration
//!
//! # Training
//!
//! ```
//! use std::sync::Arc;
//! use lgbm_core::{Booster, BoosterConfig, DatasetConfig, Params, PredictKind, testing};
//! use lgbm_core::data::NumericSlice;
//!
//! let (features, labels) = testing::binary_classification(200, 4, 0);
//! let mut train = testing::dense_dataset(&features, &DatasetConfig::default(), None).unwrap();
//! train.set_field("label", NumericSlice::F32(&labels)).unwrap();
//!
//! let params = Params::parse("objective=binary num_iterations=10 verbose=-1").unwrap();
//! let mut booster = Booster::new(Arc::new(train), vec![], BoosterConfig::from_params(&params).unwrap()).unwrap();
//! while !booster.update_one_iter().unwrap() {}
//!
//! let probabilities = booster.predict_matrix(features.view(), PredictKind::Normal, None);
//! assert_eq!(probabilities.len(), 200);
//! ```
//!
//! # C API
//!
//! The `LGBM_*` functions in [`capi`] are exported from the `cdylib`.

// Re-export approx traits for users who want to compare predictions
pub use approx;

pub mod booster;
pub mod capi;
pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod predict;
pub mod repr;
pub mod testing;
pub mod training;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use error::{Error, ErrorKind, Result};

pub use booster::{Booster, BoosterState, TrainError};
pub use config::{BoosterConfig, DatasetConfig, Params};
pub use data::{Dataset, DatasetError};
pub use model::Model;
pub use predict::{PredictKind, Predictor};

pub use training::{Metric, MetricFn, Objective, ObjectiveFn};

pub use utils::{Parallelism, run_with_threads};
