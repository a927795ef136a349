//! Gradient boosting state machine.
//!
//! A [`Booster`] owns the training and validation datasets, the growing
//! model and the scores of every row. Each call to
//! [`Booster::update_one_iter`] runs one boosting round:
//!
//! 1. compute gradients from the current training scores
//! 2. grow a leaf-wise tree on the training histograms
//! 3. shrink it and add it to the training scores (via the row partition)
//!    and to the validation scores (via binned traversal)
//! 4. evaluate metrics and check the stopping rules
//!
//! The first tree absorbs the base score as a bias, so a saved model
//! predicts from zero.

use std::path::Path;
use std::sync::Arc;

use ndarray::ArrayView2;

use crate::config::BoosterConfig;
use crate::data::{Dataset, NumericSlice};
use crate::model::Model;
use crate::predict::{PredictKind, Predictor};
use crate::repr::Tree;
use crate::training::{
    EarlyStopAction, EarlyStopping, Evaluator, Gradients, GrowerParams, MetricFn, MetricValue,
    ObjectiveFn, TrainingLogger, TreeGrower,
};
use crate::utils::{Parallelism, run_with_threads};
use crate::Result;

/// Rows per parallel chunk when updating scores by traversal.
const SCORE_CHUNK: usize = 1024;

// =============================================================================
// Errors
// =============================================================================

/// Failure to set up or advance training.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("{dataset} dataset has no labels")]
    MissingLabels { dataset: String },

    #[error("invalid labels in {dataset} dataset: {message}")]
    InvalidLabels { dataset: String, message: String },

    #[error("validation dataset '{name}' was not binned with the training dataset as reference")]
    BinMismatch { name: String },

    #[error("booster was loaded from a model and has no training data")]
    NotTrainable,

    #[error("{field} has {actual} values, expected {expected}")]
    GradientLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("validation index {index} out of range, booster has {count} validation sets")]
    UnknownEvalIndex { index: usize, count: usize },

    #[error("no validation set named '{0}'")]
    UnknownEvalName(String),
}

// =============================================================================
// State
// =============================================================================

/// Lifecycle of a booster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoosterState {
    /// Constructed, no round run yet.
    Created,
    /// At least one round run, more allowed.
    Training,
    /// No further rounds; updates are no-ops.
    Finished,
}

struct ValidSet {
    name: String,
    dataset: Arc<Dataset>,
    scores: Vec<f64>,
    metrics: Vec<f64>,
}

/// Everything that only exists while a booster can still train.
struct TrainState {
    train: Arc<Dataset>,
    valid: Vec<ValidSet>,
    grower: TreeGrower,
    gradients: Gradients,
    scores: Vec<f64>,
    base_score: f64,
    early_stopping: EarlyStopping,
}

/// Where the gradients of a round come from.
#[derive(Clone, Copy)]
enum GradientSource<'a> {
    Objective,
    Custom { grad: &'a [f32], hess: &'a [f32] },
}

/// A boosted tree ensemble, trainable round by round.
pub struct Booster {
    config: BoosterConfig,
    model: Model,
    state: BoosterState,
    iteration: usize,
    logger: TrainingLogger,
    training: Option<TrainState>,
}

impl std::fmt::Debug for Booster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Booster")
            .field("state", &self.state)
            .field("iteration", &self.iteration)
            .field("num_trees", &self.model.forest.n_trees())
            .field("trainable", &self.training.is_some())
            .finish()
    }
}

impl Booster {
    /// Set up training on `train`, evaluating on the named `valid` sets.
    ///
    /// # Errors
    ///
    /// `TrainError` when the training set has no or invalid labels, or a
    /// validation set lacks labels while metrics are configured.
    pub fn new(
        train: Arc<Dataset>,
        valid: Vec<(String, Arc<Dataset>)>,
        config: BoosterConfig,
    ) -> Result<Self> {
        let logger = TrainingLogger::new(config.verbosity);
        let objective = &config.objective;

        let labels = train.label().ok_or_else(|| TrainError::MissingLabels {
            dataset: "training".into(),
        })?;
        objective
            .check_labels(labels)
            .map_err(|message| TrainError::InvalidLabels {
                dataset: "training".into(),
                message,
            })?;
        if !config.metrics.is_empty() {
            for (name, dataset) in &valid {
                let labels = dataset.label().ok_or_else(|| TrainError::MissingLabels {
                    dataset: name.clone(),
                })?;
                objective
                    .check_labels(labels)
                    .map_err(|message| TrainError::InvalidLabels {
                        dataset: name.clone(),
                        message,
                    })?;
            }
        }

        let base_score = if config.boost_from_average {
            objective.base_score(labels, train.weight())
        } else {
            0.0
        };
        logger.debug(format_args!("Base score: {base_score}"));

        let mut early_stopping = EarlyStopping::new(0, false);
        if config.early_stopping_round > 0 {
            match (valid.is_empty(), config.metrics.first()) {
                (false, Some(metric)) => {
                    early_stopping = EarlyStopping::new(
                        config.early_stopping_round as usize,
                        metric.higher_is_better(),
                    );
                }
                _ => logger.warn(
                    "Early stopping needs at least one validation set and one metric, disabling it",
                ),
            }
        }

        let mut evaluator = Evaluator::new(&config.objective, &config.metrics);
        let valid: Vec<ValidSet> = valid
            .into_iter()
            .map(|(name, dataset)| {
                let scores = vec![base_score; dataset.num_data()];
                let metrics = evaluate(&mut evaluator, &dataset, &scores)
                    .iter()
                    .map(|m| m.value)
                    .collect();
                ValidSet {
                    name,
                    dataset,
                    scores,
                    metrics,
                }
            })
            .collect();

        let label_index = config
            .source_params
            .parse_value::<usize>("label_column")
            .ok()
            .flatten()
            .unwrap_or(0);
        let mut model = Model::new(
            config.objective.clone(),
            train.feature_names().to_vec(),
            train.bin_table(),
            label_index,
        );
        model.parameters = config
            .source_params
            .iter()
            .map(|(k, v)| format!("[{k}: {v}]"))
            .collect();

        let n_rows = train.num_data();
        let training = TrainState {
            grower: TreeGrower::new(&train, GrowerParams::from(&config)),
            gradients: Gradients::new(n_rows),
            scores: vec![base_score; n_rows],
            train,
            valid,
            base_score,
            early_stopping,
        };

        Ok(Self {
            config,
            model,
            state: BoosterState::Created,
            iteration: 0,
            logger,
            training: Some(training),
        })
    }

    /// Wrap a loaded model. The booster can predict and save but not train.
    pub fn from_model(model: Model) -> Self {
        let config = BoosterConfig {
            objective: model.objective.clone(),
            ..BoosterConfig::default()
        };
        Self {
            logger: TrainingLogger::new(config.verbosity),
            iteration: model.forest.n_trees(),
            config,
            model,
            state: BoosterState::Finished,
            training: None,
        }
    }

    pub fn load_model(path: &Path) -> Result<Self> {
        Ok(Self::from_model(Model::load(path)?))
    }

    pub fn from_model_string(content: &str) -> Result<Self> {
        Ok(Self::from_model(Model::from_text(content)?))
    }

    // =========================================================================
    // Training
    // =========================================================================

    /// Run one boosting round. Returns `true` once the booster is finished.
    ///
    /// # Errors
    ///
    /// - [`TrainError::NotTrainable`] for a booster loaded from a model.
    /// - [`TrainError::BinMismatch`] when a validation set does not share the
    ///   training bins; the state is left unchanged.
    pub fn update_one_iter(&mut self) -> Result<bool> {
        self.advance(GradientSource::Objective)
    }

    /// Run one boosting round with caller-supplied gradients and hessians,
    /// one per training row.
    pub fn update_one_iter_custom(&mut self, grad: &[f32], hess: &[f32]) -> Result<bool> {
        self.advance(GradientSource::Custom { grad, hess })
    }

    fn advance(&mut self, source: GradientSource<'_>) -> Result<bool> {
        let Some(training) = self.training.as_mut() else {
            return Err(TrainError::NotTrainable.into());
        };
        if self.state == BoosterState::Finished {
            return Ok(true);
        }

        for set in &training.valid {
            if !set.dataset.shares_bins_with(&training.train) {
                return Err(TrainError::BinMismatch {
                    name: set.name.clone(),
                }
                .into());
            }
        }
        if let GradientSource::Custom { grad, hess } = source {
            let expected = training.train.num_data();
            for (field, len) in [("grad", grad.len()), ("hess", hess.len())] {
                if len != expected {
                    return Err(TrainError::GradientLength {
                        field,
                        expected,
                        actual: len,
                    }
                    .into());
                }
            }
        }

        if self.state == BoosterState::Created {
            self.logger.start_training(self.config.num_iterations as usize);
            self.state = BoosterState::Training;
        }

        let config = &self.config;
        let forest = &mut self.model.forest;
        let iteration = self.iteration;
        let logger = &self.logger;

        let outcome = run_with_threads(config.num_threads, |parallelism| {
            let train = Arc::clone(&training.train);
            match source {
                GradientSource::Objective => {
                    let labels = train.label().unwrap_or_default();
                    config.objective.compute_gradients(
                        &training.scores,
                        labels,
                        train.weight(),
                        training.gradients.pairs_mut(),
                    );
                }
                GradientSource::Custom { grad, hess } => training.gradients.copy_from(grad, hess),
            }

            let mut tree = training
                .grower
                .grow(&train, training.gradients.pairs(), parallelism);
            if tree.num_leaves() <= 1 && iteration > 0 {
                logger.info(
                    "Stopped training because there are no more leaves that meet the split requirements",
                );
                return RoundOutcome::NoSplit;
            }

            tree.apply_shrinkage(config.learning_rate);
            training.grower.update_scores(&tree, &mut training.scores);
            for set in &mut training.valid {
                add_tree_scores(&tree, &set.dataset, &mut set.scores, parallelism);
            }
            if forest.is_empty() {
                tree.add_bias(training.base_score);
            }
            forest.push_tree(tree);
            RoundOutcome::Grown
        });

        if outcome == RoundOutcome::NoSplit {
            self.state = BoosterState::Finished;
            self.logger.finish_training(self.model.forest.n_trees());
            return Ok(true);
        }
        self.iteration += 1;

        let Some(training) = self.training.as_mut() else {
            return Err(TrainError::NotTrainable.into());
        };
        let round = self.iteration;
        let mut evaluator = Evaluator::new(&self.config.objective, &self.config.metrics);
        let log_now = round % self.config.metric_freq as usize == 0;
        if log_now && self.config.training_metric {
            let values = evaluate(&mut evaluator, &training.train, &training.scores);
            self.logger.log_metrics(round, "training", &values);
        }
        for set in &mut training.valid {
            let values = evaluate(&mut evaluator, &set.dataset, &set.scores);
            if log_now {
                self.logger.log_metrics(round, &set.name, &values);
            }
            set.metrics = values.iter().map(|m| m.value).collect();
        }

        if training.early_stopping.is_enabled() {
            let monitored = training.valid.first().and_then(|set| set.metrics.first());
            if let Some(&value) = monitored {
                if training.early_stopping.update(value) == EarlyStopAction::Stop {
                    let best = training.early_stopping.best_round();
                    let metric_name = self
                        .config
                        .metrics
                        .first()
                        .map(|m| m.name())
                        .unwrap_or_default();
                    self.logger.log_early_stopping(round, best + 1, metric_name);
                    self.rollback(best + 1);
                    self.state = BoosterState::Finished;
                    self.logger.finish_training(self.model.forest.n_trees());
                    return Ok(true);
                }
            }
        }

        if self.iteration >= self.config.num_iterations as usize {
            self.state = BoosterState::Finished;
            self.logger.finish_training(self.model.forest.n_trees());
            return Ok(true);
        }
        Ok(false)
    }

    /// Keep the first `n_trees` trees and recompute every score and metric.
    fn rollback(&mut self, n_trees: usize) {
        self.model.forest.truncate(n_trees);
        self.iteration = self.model.forest.n_trees();

        let Some(training) = self.training.as_mut() else {
            return;
        };
        let forest = &self.model.forest;
        let base_score = training.base_score;
        run_with_threads(self.config.num_threads, |parallelism| {
            let train = Arc::clone(&training.train);
            recompute_scores(forest.trees(), &train, &mut training.scores, base_score, parallelism);
            for set in &mut training.valid {
                recompute_scores(forest.trees(), &set.dataset, &mut set.scores, base_score, parallelism);
            }
        });

        let mut evaluator = Evaluator::new(&self.config.objective, &self.config.metrics);
        for set in &mut training.valid {
            set.metrics = evaluate(&mut evaluator, &set.dataset, &set.scores)
                .iter()
                .map(|m| m.value)
                .collect();
        }
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Metric values of validation set `valid_idx` (zero-based), one per
    /// configured metric, as of the latest round.
    pub fn eval(&self, valid_idx: usize) -> Result<&[f64]> {
        let valid = self.valid_sets();
        valid
            .get(valid_idx)
            .map(|set| set.metrics.as_slice())
            .ok_or_else(|| {
                TrainError::UnknownEvalIndex {
                    index: valid_idx,
                    count: valid.len(),
                }
                .into()
            })
    }

    pub fn eval_by_name(&self, name: &str) -> Result<&[f64]> {
        self.valid_sets()
            .iter()
            .find(|set| set.name == name)
            .map(|set| set.metrics.as_slice())
            .ok_or_else(|| TrainError::UnknownEvalName(name.to_string()).into())
    }

    /// Metric values on the training data.
    pub fn eval_train(&self) -> Result<Vec<f64>> {
        let training = self.training.as_ref().ok_or(TrainError::NotTrainable)?;
        let mut evaluator = Evaluator::new(&self.config.objective, &self.config.metrics);
        Ok(evaluate(&mut evaluator, &training.train, &training.scores)
            .iter()
            .map(|m| m.value)
            .collect())
    }

    /// Names of the configured metrics, in evaluation order.
    pub fn eval_names(&self) -> Vec<&'static str> {
        self.config.metrics.iter().map(|m| m.name()).collect()
    }

    pub fn valid_names(&self) -> Vec<&str> {
        self.valid_sets().iter().map(|set| set.name.as_str()).collect()
    }

    /// Current raw scores of validation set `valid_idx`.
    pub fn valid_scores(&self, valid_idx: usize) -> Option<&[f64]> {
        self.valid_sets().get(valid_idx).map(|set| set.scores.as_slice())
    }

    /// Rows of the training data; 0 for a loaded booster.
    pub fn num_train_data(&self) -> usize {
        self.training.as_ref().map_or(0, |t| t.train.num_data())
    }

    /// Current raw scores of the training rows.
    pub fn train_scores(&self) -> Option<&[f64]> {
        self.training.as_ref().map(|t| t.scores.as_slice())
    }

    fn valid_sets(&self) -> &[ValidSet] {
        self.training.as_ref().map_or(&[], |t| t.valid.as_slice())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Completed boosting rounds.
    pub fn current_iteration(&self) -> usize {
        self.iteration
    }

    pub fn num_trees(&self) -> usize {
        self.model.forest.n_trees()
    }

    pub fn state(&self) -> BoosterState {
        self.state
    }

    pub fn num_classes(&self) -> usize {
        1
    }

    pub fn config(&self) -> &BoosterConfig {
        &self.config
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn into_model(self) -> Model {
        self.model
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Write the text model with the first `num_iteration` trees (`None`
    /// for all).
    pub fn save_model(&self, path: &Path, num_iteration: Option<usize>) -> Result<()> {
        self.model.save(path, num_iteration)
    }

    pub fn save_model_to_string(&self, num_iteration: Option<usize>) -> String {
        self.model.to_text(num_iteration)
    }

    pub fn dump_model(&self, num_iteration: Option<usize>) -> Result<String> {
        Ok(self.model.to_json(num_iteration)?)
    }

    // =========================================================================
    // Prediction
    // =========================================================================

    pub fn predictor(&self, kind: PredictKind, num_iteration: Option<usize>) -> Predictor<'_> {
        Predictor::new(&self.model, kind, num_iteration)
    }

    /// Predict a row-major matrix.
    pub fn predict_matrix(
        &self,
        rows: ArrayView2<'_, f64>,
        kind: PredictKind,
        num_iteration: Option<usize>,
    ) -> Vec<f64> {
        let predictor = self.predictor(kind, num_iteration);
        run_with_threads(self.config.num_threads, |par| predictor.predict_matrix(rows, par))
    }

    pub fn predict_csr(
        &self,
        indptr: NumericSlice<'_>,
        indices: &[i32],
        data: NumericSlice<'_>,
        num_col: usize,
        kind: PredictKind,
        num_iteration: Option<usize>,
    ) -> Result<Vec<f64>> {
        let predictor = self.predictor(kind, num_iteration);
        let out = run_with_threads(self.config.num_threads, |par| {
            predictor.predict_csr(indptr, indices, data, num_col, par)
        })?;
        Ok(out)
    }

    pub fn predict_file(
        &self,
        input: &Path,
        output: &Path,
        has_header: bool,
        kind: PredictKind,
        num_iteration: Option<usize>,
    ) -> Result<()> {
        let predictor = self.predictor(kind, num_iteration);
        run_with_threads(self.config.num_threads, |par| {
            predictor.predict_file(input, output, has_header, par)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoundOutcome {
    Grown,
    NoSplit,
}

fn evaluate(evaluator: &mut Evaluator<'_>, dataset: &Dataset, scores: &[f64]) -> Vec<MetricValue> {
    match dataset.label() {
        Some(labels) => evaluator.evaluate(scores, labels, dataset.weight()),
        None => Vec::new(),
    }
}

/// Add `tree`'s output to `scores`, traversing with each row's bin upper
/// bounds.
fn add_tree_scores(tree: &Tree, dataset: &Dataset, scores: &mut [f64], parallelism: Parallelism) {
    let table = dataset.bin_table();
    parallelism.for_each_chunk_mut(scores, SCORE_CHUNK, |chunk_idx, chunk| {
        let first = chunk_idx * SCORE_CHUNK;
        for (i, score) in chunk.iter_mut().enumerate() {
            let row = first + i;
            *score += tree.predict(|f| table.mapper(f).bin_to_value(dataset.bin(row, f)));
        }
    });
}

fn recompute_scores<'t>(
    trees: impl Iterator<Item = &'t Tree>,
    dataset: &Dataset,
    scores: &mut [f64],
    base_score: f64,
    parallelism: Parallelism,
) {
    let mut any = false;
    scores.fill(0.0);
    for tree in trees {
        any = true;
        add_tree_scores(tree, dataset, scores, parallelism);
    }
    if !any {
        scores.fill(base_score);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, ErrorKind};
    use crate::config::{DatasetConfig, Params};
    use crate::testing;
    use approx::assert_abs_diff_eq;

    fn binary_data(n_rows: usize, seed: u64) -> (Arc<Dataset>, Arc<Dataset>) {
        let (all_features, all_labels) = testing::binary_classification(n_rows + n_rows / 2, 5, seed);
        let ((features, labels), (valid_features, valid_labels)) =
            testing::train_test_split(&all_features, &all_labels, n_rows);
        let config = DatasetConfig::default();
        let mut train = testing::dense_dataset(&features, &config, None).unwrap();
        train.set_field("label", NumericSlice::F32(&labels)).unwrap();

        let mut valid = testing::dense_dataset(&valid_features, &config, Some(&train)).unwrap();
        valid.set_field("label", NumericSlice::F32(&valid_labels)).unwrap();
        (Arc::new(train), Arc::new(valid))
    }

    fn config(params: &str) -> BoosterConfig {
        BoosterConfig::from_params(&Params::parse(params).unwrap()).unwrap()
    }

    #[test]
    fn trains_round_by_round_until_budget() {
        let (train, valid) = binary_data(300, 1);
        let mut booster = Booster::new(
            train,
            vec![("valid".into(), valid)],
            config("objective=binary metric=auc num_iterations=5 num_leaves=7 min_data_in_leaf=5 verbose=-1"),
        )
        .unwrap();
        assert_eq!(booster.state(), BoosterState::Created);

        for round in 1..=4 {
            assert!(!booster.update_one_iter().unwrap());
            assert_eq!(booster.num_trees(), round);
            assert_eq!(booster.state(), BoosterState::Training);
        }
        assert!(booster.update_one_iter().unwrap());
        assert_eq!(booster.state(), BoosterState::Finished);
        assert_eq!(booster.num_trees(), 5);

        // Finished is idempotent
        assert!(booster.update_one_iter().unwrap());
        assert_eq!(booster.num_trees(), 5);

        let auc = booster.eval(0).unwrap()[0];
        assert!((0.5..=1.0).contains(&auc), "auc = {auc}");
    }

    #[test]
    fn validation_scores_match_raw_prediction() {
        let (features, labels) = testing::binary_classification(200, 4, 7);
        let mut train = testing::dense_dataset(&features, &DatasetConfig::default(), None).unwrap();
        train.set_field("label", NumericSlice::F32(&labels)).unwrap();
        let train = Arc::new(train);

        let mut booster = Booster::new(
            Arc::clone(&train),
            vec![("self".into(), Arc::clone(&train))],
            config("objective=binary num_iterations=3 num_leaves=5 min_data_in_leaf=3 verbose=-1"),
        )
        .unwrap();
        while !booster.update_one_iter().unwrap() {}

        let raw = booster.predict_matrix(features.view(), PredictKind::RawScore, None);
        let train_scores = booster.train_scores().unwrap();
        let valid_scores = booster.valid_scores(0).unwrap();
        for i in 0..raw.len() {
            assert_abs_diff_eq!(raw[i], train_scores[i], epsilon = 1e-9);
            assert_abs_diff_eq!(raw[i], valid_scores[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn initial_metrics_before_first_round() {
        let (train, valid) = binary_data(100, 3);
        let booster = Booster::new(
            train,
            vec![("valid".into(), valid)],
            config("objective=binary metric=binary_logloss verbose=-1"),
        )
        .unwrap();
        let logloss = booster.eval(0).unwrap()[0];
        assert!(logloss > 0.0 && logloss.is_finite());
        assert_eq!(booster.eval_names(), vec!["binary_logloss"]);
        assert_eq!(booster.eval_by_name("valid").unwrap(), booster.eval(0).unwrap());
    }

    #[test]
    fn unknown_eval_targets() {
        let (train, valid) = binary_data(100, 3);
        let booster = Booster::new(
            train,
            vec![("valid".into(), valid)],
            config("objective=binary verbose=-1"),
        )
        .unwrap();
        assert_eq!(booster.eval(1).unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            booster.eval_by_name("test").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn missing_and_invalid_labels() {
        let (features, _) = testing::binary_classification(50, 3, 1);
        let unlabeled = Arc::new(testing::dense_dataset(&features, &DatasetConfig::default(), None).unwrap());
        let err = Booster::new(Arc::clone(&unlabeled), vec![], config("verbose=-1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let mut train = testing::dense_dataset(&features, &DatasetConfig::default(), None).unwrap();
        train.set_field("label", NumericSlice::F32(&[2.0; 50])).unwrap();
        let err = Booster::new(Arc::new(train), vec![], config("objective=binary verbose=-1")).unwrap_err();
        assert!(matches!(err, Error::Train(TrainError::InvalidLabels { .. })));
    }

    #[test]
    fn bin_mismatch_fails_at_round_advance() {
        let (train, _) = binary_data(100, 5);
        let (features, labels) = testing::binary_classification(60, 5, 9);
        let mut foreign = testing::dense_dataset(&features, &DatasetConfig::default(), None).unwrap();
        foreign.set_field("label", NumericSlice::F32(&labels)).unwrap();

        let mut booster = Booster::new(
            train,
            vec![("foreign".into(), Arc::new(foreign))],
            config("objective=binary verbose=-1"),
        )
        .unwrap();
        let err = booster.update_one_iter().unwrap_err();
        assert!(matches!(err, Error::Train(TrainError::BinMismatch { .. })));
        assert_eq!(booster.state(), BoosterState::Created);
        assert_eq!(booster.num_trees(), 0);
    }

    #[test]
    fn early_stopping_rolls_back_to_best_round() {
        let (train, valid) = binary_data(200, 11);
        let mut booster = Booster::new(
            train,
            vec![("valid".into(), valid)],
            config(
                "objective=binary metric=binary_logloss num_iterations=200 num_leaves=31 \
                 min_data_in_leaf=1 learning_rate=0.9 early_stopping_round=3 verbose=-1",
            ),
        )
        .unwrap();

        let mut history = Vec::new();
        while !booster.update_one_iter().unwrap() {
            history.push(booster.eval(0).unwrap()[0]);
        }
        assert_eq!(booster.state(), BoosterState::Finished);
        assert!(booster.num_trees() < 200);
        assert_eq!(booster.current_iteration(), booster.num_trees());

        let best = booster.eval(0).unwrap()[0];
        let min = history.iter().copied().fold(f64::INFINITY, f64::min);
        assert_abs_diff_eq!(best, min, epsilon = 1e-9);
    }

    #[test]
    fn custom_gradients_drive_a_round() {
        let (train, _) = binary_data(100, 2);
        let n = train.num_data();
        let mut booster = Booster::new(train, vec![], config("num_iterations=2 verbose=-1")).unwrap();

        let err = booster.update_one_iter_custom(&[0.0; 3], &[1.0; 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(booster.state(), BoosterState::Created);

        let grad: Vec<f32> = (0..n).map(|i| if i % 2 == 0 { -1.0 } else { 1.0 }).collect();
        assert!(!booster.update_one_iter_custom(&grad, &vec![1.0; n]).unwrap());
        assert_eq!(booster.num_trees(), 1);
    }

    #[test]
    fn constant_gradients_finish_after_first_tree() {
        let (train, _) = binary_data(100, 2);
        let n = train.num_data();
        let mut booster = Booster::new(train, vec![], config("num_iterations=10 verbose=-1")).unwrap();
        let grad = vec![0.5f32; n];
        let hess = vec![1.0f32; n];
        assert!(!booster.update_one_iter_custom(&grad, &hess).unwrap());
        assert!(booster.update_one_iter_custom(&grad, &hess).unwrap());
        assert_eq!(booster.num_trees(), 1);
        assert_eq!(booster.state(), BoosterState::Finished);
    }

    #[test]
    fn loaded_booster_cannot_train() {
        let (train, _) = binary_data(100, 4);
        let mut booster = Booster::new(train, vec![], config("objective=binary num_iterations=2 verbose=-1")).unwrap();
        while !booster.update_one_iter().unwrap() {}

        let text = booster.save_model_to_string(None);
        let mut loaded = Booster::from_model_string(&text).unwrap();
        assert_eq!(loaded.state(), BoosterState::Finished);
        assert_eq!(loaded.num_trees(), 2);
        assert_eq!(loaded.update_one_iter().unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(loaded.model().forest, booster.model().forest);
    }

    #[test]
    fn model_carries_parameters() {
        let (train, _) = binary_data(100, 4);
        let booster = Booster::new(train, vec![], config("objective=binary num_leaves=7 verbose=-1")).unwrap();
        let text = booster.save_model_to_string(None);
        assert!(text.contains("[objective: binary]"));
        assert!(text.contains("[num_leaves: 7]"));
    }
}
