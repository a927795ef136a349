//! Booster configuration.
//!
//! [`BoosterConfig`] groups the training settings: objective and metrics,
//! boosting schedule, tree shape ([`TreeParams`]), regularization
//! ([`RegularizationParams`]), early stopping and resources.
//!
//! # Example
//!
//! ```
//! use lgbm_core::config::{BoosterConfig, TreeParams};
//! use lgbm_core::training::{Metric, Objective};
//!
//! let config = BoosterConfig::builder()
//!     .objective(Objective::logistic())
//!     .metrics(vec![Metric::auc()])
//!     .num_iterations(50)
//!     .tree(TreeParams { num_leaves: 15, max_depth: -1 })
//!     .build()
//!     .unwrap();
//! assert_eq!(config.learning_rate, 0.1);
//! ```

use bon::Builder;

use super::{ConfigError, Params};
use crate::training::{Metric, Objective, ObjectiveFn, Verbosity};

// =============================================================================
// Parameter groups
// =============================================================================

/// Tree shape limits for leaf-wise growth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    /// Maximum leaves per tree. Default: 31.
    pub num_leaves: u32,
    /// Maximum depth; `<= 0` means unlimited. Default: -1.
    pub max_depth: i32,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            num_leaves: 31,
            max_depth: -1,
        }
    }
}

impl TreeParams {
    pub fn max_depth(&self) -> Option<u32> {
        (self.max_depth > 0).then_some(self.max_depth as u32)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.num_leaves < 2 {
            return Err(ConfigError::out_of_range("num_leaves", self.num_leaves, "at least 2"));
        }
        Ok(())
    }
}

/// Leaf regularization and split constraints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegularizationParams {
    /// L1 penalty on leaf values. Default: 0.
    pub lambda_l1: f64,
    /// L2 penalty on leaf values. Default: 0.
    pub lambda_l2: f64,
    /// Minimum rows in a leaf. Default: 20.
    pub min_data_in_leaf: u32,
    /// Minimum hessian sum in a leaf. Default: 1e-3.
    pub min_sum_hessian_in_leaf: f64,
    /// Minimum gain for a split to be kept. Default: 0.
    pub min_gain_to_split: f64,
}

impl Default for RegularizationParams {
    fn default() -> Self {
        Self {
            lambda_l1: 0.0,
            lambda_l2: 0.0,
            min_data_in_leaf: 20,
            min_sum_hessian_in_leaf: 1e-3,
            min_gain_to_split: 0.0,
        }
    }
}

impl RegularizationParams {
    fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("lambda_l1", self.lambda_l1),
            ("lambda_l2", self.lambda_l2),
            ("min_sum_hessian_in_leaf", self.min_sum_hessian_in_leaf),
            ("min_gain_to_split", self.min_gain_to_split),
        ];
        for (key, value) in non_negative {
            if !(value >= 0.0) || !value.is_finite() {
                return Err(ConfigError::out_of_range(key, value, "a finite non-negative number"));
            }
        }
        Ok(())
    }
}

// =============================================================================
// BoosterConfig
// =============================================================================

/// Configuration of a boosting run.
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct BoosterConfig {
    /// Loss function. Default: squared loss.
    #[builder(default)]
    pub objective: Objective,

    /// Metrics evaluated after each round. Empty disables evaluation.
    #[builder(default)]
    pub metrics: Vec<Metric>,

    /// Boosting rounds. Default: 100.
    #[builder(default = 100)]
    pub num_iterations: u32,

    /// Shrinkage applied to each new tree. Default: 0.1.
    #[builder(default = 0.1)]
    pub learning_rate: f64,

    #[builder(default)]
    pub tree: TreeParams,

    #[builder(default)]
    pub regularization: RegularizationParams,

    /// Start from the objective's optimal constant. Default: true.
    #[builder(default = true)]
    pub boost_from_average: bool,

    /// Stop after this many rounds without improvement on the first metric
    /// of the first validation set. 0 disables early stopping.
    #[builder(default)]
    pub early_stopping_round: u32,

    /// Also evaluate metrics on the training data. Default: false.
    #[builder(default)]
    pub training_metric: bool,

    /// Log metrics every `metric_freq` rounds. Default: 1.
    #[builder(default = 1)]
    pub metric_freq: u32,

    /// Worker threads; 0 uses all cores.
    #[builder(default)]
    pub num_threads: usize,

    #[builder(default)]
    pub verbosity: Verbosity,

    /// Parameters this config was read from, echoed into saved models.
    #[builder(default)]
    pub source_params: Params,
}

impl<S: booster_config_builder::IsComplete> BoosterConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value is out of range.
    pub fn build(self) -> Result<BoosterConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl BoosterConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.learning_rate > 0.0) || !self.learning_rate.is_finite() {
            return Err(ConfigError::out_of_range(
                "learning_rate",
                self.learning_rate,
                "positive",
            ));
        }
        if self.num_iterations == 0 {
            return Err(ConfigError::out_of_range("num_iterations", 0, "at least 1"));
        }
        if self.metric_freq == 0 {
            return Err(ConfigError::out_of_range("metric_freq", 0, "at least 1"));
        }
        self.tree.validate()?;
        self.regularization.validate()?;
        Ok(())
    }

    /// Read booster settings from a parameter string; dataset-only keys
    /// are ignored.
    pub fn from_params(params: &Params) -> Result<Self, ConfigError> {
        let sigmoid = params.parse_value::<f64>("sigmoid")?.unwrap_or(1.0);
        if !(sigmoid > 0.0) || !sigmoid.is_finite() {
            return Err(ConfigError::out_of_range("sigmoid", sigmoid, "positive"));
        }
        let objective = match params.get("objective") {
            Some(name) => Objective::from_name(name, sigmoid)
                .ok_or_else(|| ConfigError::UnknownObjective(name.to_string()))?,
            None => Objective::default(),
        };
        let metrics = match params.get("metric") {
            Some(list) => parse_metrics(list)?,
            None => vec![objective.default_metric()],
        };

        let defaults = RegularizationParams::default();
        let regularization = RegularizationParams {
            lambda_l1: params.parse_value("lambda_l1")?.unwrap_or(defaults.lambda_l1),
            lambda_l2: params.parse_value("lambda_l2")?.unwrap_or(defaults.lambda_l2),
            min_data_in_leaf: params
                .parse_value("min_data_in_leaf")?
                .unwrap_or(defaults.min_data_in_leaf),
            min_sum_hessian_in_leaf: params
                .parse_value("min_sum_hessian_in_leaf")?
                .unwrap_or(defaults.min_sum_hessian_in_leaf),
            min_gain_to_split: params
                .parse_value("min_gain_to_split")?
                .unwrap_or(defaults.min_gain_to_split),
        };
        let tree_defaults = TreeParams::default();
        let tree = TreeParams {
            num_leaves: params.parse_value("num_leaves")?.unwrap_or(tree_defaults.num_leaves),
            max_depth: params.parse_value("max_depth")?.unwrap_or(tree_defaults.max_depth),
        };
        let early_stopping_round = params
            .parse_value::<i64>("early_stopping_round")?
            .unwrap_or(0)
            .clamp(0, u32::MAX as i64) as u32;
        let num_threads = params.parse_value::<i64>("num_threads")?.unwrap_or(0).max(0) as usize;
        let verbosity = Verbosity::from_level(params.parse_value("verbose")?.unwrap_or(1));

        BoosterConfig::builder()
            .objective(objective)
            .metrics(metrics)
            .maybe_num_iterations(params.parse_value("num_iterations")?)
            .maybe_learning_rate(params.parse_value("learning_rate")?)
            .tree(tree)
            .regularization(regularization)
            .maybe_boost_from_average(params.parse_bool("boost_from_average")?)
            .early_stopping_round(early_stopping_round)
            .maybe_training_metric(params.parse_bool("is_provide_training_metric")?)
            .maybe_metric_freq(params.parse_value("metric_freq")?)
            .num_threads(num_threads)
            .verbosity(verbosity)
            .source_params(params.clone())
            .build()
    }
}

impl Default for BoosterConfig {
    fn default() -> Self {
        Self {
            objective: Objective::default(),
            metrics: Vec::new(),
            num_iterations: 100,
            learning_rate: 0.1,
            tree: TreeParams::default(),
            regularization: RegularizationParams::default(),
            boost_from_average: true,
            early_stopping_round: 0,
            training_metric: false,
            metric_freq: 1,
            num_threads: 0,
            verbosity: Verbosity::default(),
            source_params: Params::default(),
        }
    }
}

/// Comma separated metric names; `none` (or an empty list) disables metrics.
fn parse_metrics(list: &str) -> Result<Vec<Metric>, ConfigError> {
    let mut metrics: Vec<Metric> = Vec::new();
    for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if matches!(name, "none" | "null" | "na" | "custom") {
            return Ok(Vec::new());
        }
        let metric = Metric::from_name(name).ok_or_else(|| ConfigError::UnknownMetric(name.to_string()))?;
        if !metrics.contains(&metric) {
            metrics.push(metric);
        }
    }
    Ok(metrics)
}
