//! Early stopping for training.
//!
//! Monitors a validation metric and signals when no improvement has been
//! seen for a number of rounds.

/// Outcome of feeding one round's metric to [`EarlyStopping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyStopAction {
    /// The value is a new best.
    Improved,
    /// No improvement, still within patience.
    Continue,
    /// Patience exhausted.
    Stop,
}

/// Early stopping state.
///
/// A value equal to the best seen so far is not an improvement.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    best_value: Option<f64>,
    best_round: usize,
    current_round: usize,
    higher_is_better: bool,
}

impl EarlyStopping {
    /// `patience == 0` disables stopping.
    pub fn new(patience: usize, higher_is_better: bool) -> Self {
        Self {
            patience,
            best_value: None,
            best_round: 0,
            current_round: 0,
            higher_is_better,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.patience > 0
    }

    /// Record the metric of the next round.
    pub fn update(&mut self, value: f64) -> EarlyStopAction {
        let is_improvement = match self.best_value {
            None => true,
            Some(best) => {
                if self.higher_is_better {
                    value > best
                } else {
                    value < best
                }
            }
        };

        if is_improvement {
            self.best_value = Some(value);
            self.best_round = self.current_round;
        }
        self.current_round += 1;

        if is_improvement {
            EarlyStopAction::Improved
        } else if self.is_enabled() && self.current_round - self.best_round > self.patience {
            EarlyStopAction::Stop
        } else {
            EarlyStopAction::Continue
        }
    }

    pub fn best_value(&self) -> Option<f64> {
        self.best_value
    }

    /// Zero-based round at which the best value was observed.
    pub fn best_round(&self) -> usize {
        self.best_round
    }

    pub fn current_round(&self) -> usize {
        self.current_round
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_stop_while_improving() {
        let mut es = EarlyStopping::new(3, false);
        for v in [1.0, 0.9, 0.8, 0.7, 0.6] {
            assert_eq!(es.update(v), EarlyStopAction::Improved);
        }
        assert_eq!(es.best_round(), 4);
    }

    #[test]
    fn stops_after_patience() {
        let mut es = EarlyStopping::new(2, false);
        assert_eq!(es.update(1.0), EarlyStopAction::Improved);
        assert_eq!(es.update(0.5), EarlyStopAction::Improved);
        assert_eq!(es.update(0.6), EarlyStopAction::Continue);
        assert_eq!(es.update(0.7), EarlyStopAction::Stop);
        assert_eq!(es.best_round(), 1);
        assert_eq!(es.best_value(), Some(0.5));
    }

    #[test]
    fn higher_is_better() {
        let mut es = EarlyStopping::new(1, true);
        assert_eq!(es.update(0.6), EarlyStopAction::Improved);
        assert_eq!(es.update(0.7), EarlyStopAction::Improved);
        assert_eq!(es.update(0.65), EarlyStopAction::Stop);
    }

    #[test]
    fn ties_are_not_improvements() {
        let mut es = EarlyStopping::new(1, true);
        es.update(0.5);
        assert_eq!(es.update(0.5), EarlyStopAction::Stop);
        assert_eq!(es.best_round(), 0);
    }

    #[test]
    fn disabled_never_stops() {
        let mut es = EarlyStopping::new(0, false);
        assert!(!es.is_enabled());
        es.update(0.1);
        for _ in 0..20 {
            assert_ne!(es.update(1.0), EarlyStopAction::Stop);
        }
    }
}
