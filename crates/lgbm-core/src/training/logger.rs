//! Verbosity-gated training and ingestion logging.

use std::fmt::Display;

use super::eval::MetricValue;

/// Logging verbosity.
///
/// Ordered so that `verbosity >= Verbosity::Info` reads naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// No output at all.
    Silent,
    /// Warnings only.
    Warning,
    /// Progress and per-round metrics.
    #[default]
    Info,
    /// Everything, including per-tree details.
    Debug,
}

impl Verbosity {
    /// Map the integer `verbose` parameter: `<0` silent, `0` warnings,
    /// `1` info, `>=2` debug.
    pub fn from_level(level: i32) -> Self {
        match level {
            i32::MIN..=-1 => Verbosity::Silent,
            0 => Verbosity::Warning,
            1 => Verbosity::Info,
            _ => Verbosity::Debug,
        }
    }
}

/// Writes training progress to stdout and warnings to stderr.
#[derive(Debug, Clone)]
pub struct TrainingLogger {
    verbosity: Verbosity,
}

impl TrainingLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn warn(&self, msg: impl Display) {
        if self.verbosity >= Verbosity::Warning {
            eprintln!("[LightGBM] [Warning] {msg}");
        }
    }

    pub fn info(&self, msg: impl Display) {
        if self.verbosity >= Verbosity::Info {
            println!("[LightGBM] [Info] {msg}");
        }
    }

    pub fn debug(&self, msg: impl Display) {
        if self.verbosity >= Verbosity::Debug {
            println!("[LightGBM] [Debug] {msg}");
        }
    }

    pub fn start_training(&self, n_rounds: usize) {
        self.info(format_args!("Start training for at most {n_rounds} iterations"));
    }

    /// Log metrics of one round, e.g. `[12] test's auc: 0.834512`.
    pub fn log_metrics(&self, round: usize, set_name: &str, metrics: &[MetricValue]) {
        if self.verbosity < Verbosity::Info || metrics.is_empty() {
            return;
        }
        let joined = metrics
            .iter()
            .map(|m| format!("{set_name}'s {m}"))
            .collect::<Vec<_>>()
            .join("\t");
        self.info(format_args!("[{round}]\t{joined}"));
    }

    pub fn log_early_stopping(&self, round: usize, best_round: usize, metric_name: &str) {
        self.info(format_args!(
            "Early stopping at iteration {round}, the best iteration round is {best_round} ({metric_name})"
        ));
    }

    pub fn finish_training(&self, n_trees: usize) {
        self.info(format_args!("Finished training with {n_trees} trees"));
    }
}
