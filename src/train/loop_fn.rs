use std::sync::Arc;
use std::time::Instant;

use crate::error::Result;
use crate::model::core::GraphModel;
use crate::model::regressor::{GraphRegressor, StepMode};
use crate::train::early_stop::{EarlyStopping, Verdict};
use crate::train::epoch_stats::{EpochAccumulator, EpochLogEntry, EpochResult};
use crate::train::run_log::RunLog;
use crate::train::streamer::MinibatchStreamer;
use crate::train::train_config::TrainConfig;

/// Why `Trainer::train` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Validation accuracy did not improve for more than `patience` epochs.
    EarlyStopped,
    /// Every epoch in `1..num_epochs` ran.
    Exhausted,
}

/// Summary of a finished training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    pub epochs_run: usize,
    /// Lowest validation accuracy (mean absolute error) seen.
    pub best_valid_accuracy: f64,
    /// Epoch of `best_valid_accuracy`; 0 if no epoch ran.
    pub best_epoch: usize,
    pub stop_reason: StopReason,
}

/// Drives a `GraphRegressor` through training and validation passes.
pub struct Trainer<M: GraphModel> {
    regressor: GraphRegressor<M>,
    train_data: Arc<M::Dataset>,
    valid_data: Arc<M::Dataset>,
    config: TrainConfig,
    log: RunLog,
}

impl<M: GraphModel> Trainer<M> {
    pub fn new(
        regressor: GraphRegressor<M>,
        train_data: M::Dataset,
        valid_data: M::Dataset,
        config: TrainConfig,
        log: RunLog,
    ) -> Self {
        Trainer {
            regressor,
            train_data: Arc::new(train_data),
            valid_data: Arc::new(valid_data),
            config,
            log,
        }
    }

    pub fn regressor(&self) -> &GraphRegressor<M> {
        &self.regressor
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    // -----------------------------------------------------------------------
    // Epoch loop
    // -----------------------------------------------------------------------

    /// Runs epochs `1..num_epochs`, each a training pass followed by a
    /// validation pass, until the budget is spent or validation accuracy
    /// stops improving.
    ///
    /// The run log is rewritten after every epoch. Any error aborts the run;
    /// the log then holds every epoch that completed before it.
    pub fn train(&mut self) -> Result<TrainingOutcome> {
        let start = Instant::now();
        let mut stopper = EarlyStopping::new(self.config.patience);
        let mut epochs_run = 0;

        for epoch in 1..self.config.num_epochs {
            log::info!("== Epoch {}", epoch);

            let train_results = self.run_epoch(&format!("epoch {} (training)", epoch), true)?;
            log::info!("Train: {}", summary(&train_results));
            let valid_results = self.run_epoch(&format!("epoch {} (validation)", epoch), false)?;
            log::info!("Valid: {}", summary(&valid_results));

            let entry = EpochLogEntry {
                epoch,
                time: start.elapsed().as_secs_f64(),
                train_results,
                valid_results,
                valid_error_rate: valid_results.error_ratio,
            };
            self.log.record(entry.clone())?;
            epochs_run = epoch;

            if let Some(ref tx) = self.config.progress_tx {
                // Nobody listening is fine; progress is informational.
                let _ = tx.send(entry);
            }

            match stopper.observe(epoch, valid_results.accuracy) {
                Verdict::Improved => log::info!(
                    "  (Best epoch so far, cum. val. acc decreased to {:.5})",
                    valid_results.accuracy
                ),
                Verdict::Continue => {}
                Verdict::Stop => {
                    log::info!(
                        "Stopping training after {} epochs without improvement on validation accuracy.",
                        self.config.patience
                    );
                    return Ok(self.outcome(epochs_run, &stopper, StopReason::EarlyStopped));
                }
            }
        }

        Ok(self.outcome(epochs_run, &stopper, StopReason::Exhausted))
    }

    fn outcome(&self, epochs_run: usize, stopper: &EarlyStopping, stop_reason: StopReason) -> TrainingOutcome {
        TrainingOutcome {
            epochs_run,
            best_valid_accuracy: stopper.best_accuracy(),
            best_epoch: stopper.best_epoch(),
            stop_reason,
        }
    }

    // -----------------------------------------------------------------------
    // One pass
    // -----------------------------------------------------------------------

    /// One pass over the training split (`is_training`) or the validation
    /// split.
    ///
    /// Minibatches are built on a producer thread and consumed here in
    /// order. Training batches carry the configured dropout keep
    /// probability and update the weights; validation batches run with
    /// keep probability 1.0 and no update.
    ///
    /// # Arguments
    /// - `pass`       : label used in progress output and errors
    /// - `is_training`: selects the split, the dropout setting and whether
    ///                  the optimizer steps
    pub fn run_epoch(&mut self, pass: &str, is_training: bool) -> Result<EpochResult> {
        let data = if is_training {
            Arc::clone(&self.train_data)
        } else {
            Arc::clone(&self.valid_data)
        };
        let (mode, keep_prob) = if is_training {
            (StepMode::Train, self.config.dropout_keep_prob)
        } else {
            (StepMode::Evaluate, 1.0)
        };

        let start = Instant::now();
        let mut totals = EpochAccumulator::new();
        let batches = MinibatchStreamer::spawn(self.regressor.make_minibatch_iterator(data, is_training))?;

        for (step, batch) in batches.enumerate() {
            let mut batch = batch?;
            batch.dropout_keep_prob = keep_prob;

            let output = self.regressor.run_step(&batch, mode)?;
            totals.add(output.loss, output.accuracy, batch.num_graphs);

            log::debug!(
                "{} batch {} ({} graphs): loss {:.5} | mae {:.5}",
                pass,
                step,
                batch.num_graphs,
                totals.mean_loss(),
                totals.mean_accuracy()
            );
        }

        totals.finish(pass, self.config.task_id, start.elapsed().as_secs_f64())
    }
}

fn summary(r: &EpochResult) -> String {
    format!(
        "loss: {:.5} | acc: {:.5} | error_ratio: {:.5} | instances/sec: {:.2}",
        r.loss, r.accuracy, r.error_ratio, r.instances_per_sec
    )
}
