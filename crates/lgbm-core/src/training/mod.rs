//! Training infrastructure for gradient boosting.
//!
//! - [`Objective`]: gradients, base score and output transform of a loss
//! - [`Metric`]: evaluation metrics, computed through [`Evaluator`]
//! - [`EarlyStopping`]: stops training when a validation metric plateaus
//! - [`TrainingLogger`]: verbosity-gated progress output
//! - [`gbdt`]: histogram-based tree growing

mod callback;
mod eval;
pub mod gbdt;
mod gradients;
mod logger;
pub mod metrics;
pub mod objectives;

pub use callback::{EarlyStopAction, EarlyStopping};
pub use eval::{Evaluator, MetricValue};
pub use gbdt::{GainParams, GrowerParams, TreeGrower};
pub use gradients::{Gradients, GradsTuple};
pub use logger::{TrainingLogger, Verbosity};
pub use metrics::{Auc, BinaryError, L1, L2, LogLoss, Metric, MetricFn, Rmse};
pub use objectives::{LogisticLoss, Objective, ObjectiveFn, PredictionKind, SquaredLoss};
