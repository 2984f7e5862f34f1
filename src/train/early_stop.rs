/// What one validation result means for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// New best validation accuracy.
    Improved,
    /// No improvement, still within patience.
    Continue,
    /// No improvement for more than `patience` epochs.
    Stop,
}

/// Patience-based early stopping on validation accuracy (lower is better).
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    best_accuracy: f64,
    best_epoch: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        EarlyStopping {
            patience,
            best_accuracy: f64::INFINITY,
            best_epoch: 0,
        }
    }

    pub fn best_accuracy(&self) -> f64 {
        self.best_accuracy
    }

    pub fn best_epoch(&self) -> usize {
        self.best_epoch
    }

    /// Records the validation accuracy of `epoch`.
    ///
    /// Only a strictly lower value counts as an improvement. Otherwise the
    /// run stops once `epoch - best_epoch > patience`.
    pub fn observe(&mut self, epoch: usize, accuracy: f64) -> Verdict {
        if accuracy < self.best_accuracy {
            self.best_accuracy = accuracy;
            self.best_epoch = epoch;
            Verdict::Improved
        } else if epoch.saturating_sub(self.best_epoch) > self.patience {
            Verdict::Stop
        } else {
            Verdict::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_once_patience_is_exceeded() {
        let mut stopper = EarlyStopping::new(2);
        let verdicts: Vec<Verdict> = [5.0, 4.0, 6.0, 7.0, 8.0].iter()
            .enumerate()
            .map(|(i, &acc)| stopper.observe(i + 1, acc))
            .collect();

        assert_eq!(
            verdicts,
            vec![Verdict::Improved, Verdict::Improved, Verdict::Continue, Verdict::Continue, Verdict::Stop]
        );
        assert_eq!(stopper.best_epoch(), 2);
        assert_eq!(stopper.best_accuracy(), 4.0);
    }

    #[test]
    fn equal_accuracy_is_not_an_improvement() {
        let mut stopper = EarlyStopping::new(0);
        assert_eq!(stopper.observe(1, 1.0), Verdict::Improved);
        assert_eq!(stopper.observe(2, 1.0), Verdict::Stop);
        assert_eq!(stopper.best_epoch(), 1);
    }

    #[test]
    fn nan_never_counts_as_best() {
        let mut stopper = EarlyStopping::new(5);
        assert_eq!(stopper.observe(1, f64::NAN), Verdict::Continue);
        assert_eq!(stopper.best_epoch(), 0);
    }
}
