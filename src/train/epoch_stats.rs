use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};
use crate::train::reference::error_ratio;

/// Lower bound on a pass duration when computing throughput.
const MIN_ELAPSED_SECONDS: f64 = 1e-9;

/// Aggregate of one training or validation pass.
///
/// Serialized as `[loss, accuracy, error_ratio, instances_per_sec]`, the
/// layout the run log uses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct EpochResult {
    /// Graph-weighted mean of `0.5 · (prediction − target)²`.
    pub loss: f64,
    /// Graph-weighted mean absolute error. Lower is better.
    pub accuracy: f64,
    /// `accuracy` over the task's chemical accuracy.
    pub error_ratio: f64,
    /// Graphs processed per wall-clock second.
    pub instances_per_sec: f64,
}

impl From<[f64; 4]> for EpochResult {
    fn from(v: [f64; 4]) -> Self {
        EpochResult {
            loss: v[0],
            accuracy: v[1],
            error_ratio: v[2],
            instances_per_sec: v[3],
        }
    }
}

impl From<EpochResult> for [f64; 4] {
    fn from(r: EpochResult) -> Self {
        [r.loss, r.accuracy, r.error_ratio, r.instances_per_sec]
    }
}

/// Running sums of a pass, weighted by the graph count of each batch.
///
/// Batches may differ in size, so the mean is taken over graphs rather than
/// over batches.
#[derive(Debug, Clone, Default)]
pub struct EpochAccumulator {
    loss_sum: f64,
    accuracy_sum: f64,
    num_graphs: usize,
}

impl EpochAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, loss: f64, accuracy: f64, num_graphs: usize) {
        self.loss_sum += loss * num_graphs as f64;
        self.accuracy_sum += accuracy * num_graphs as f64;
        self.num_graphs += num_graphs;
    }

    pub fn num_graphs(&self) -> usize {
        self.num_graphs
    }

    /// Mean loss so far; 0 before the first batch.
    pub fn mean_loss(&self) -> f64 {
        if self.num_graphs == 0 { 0.0 } else { self.loss_sum / self.num_graphs as f64 }
    }

    /// Mean accuracy so far; 0 before the first batch.
    pub fn mean_accuracy(&self) -> f64 {
        if self.num_graphs == 0 { 0.0 } else { self.accuracy_sum / self.num_graphs as f64 }
    }

    /// Closes the pass. A NaN or infinite mean fails with
    /// `Error::Numerical`, so a diverged run never reaches the log.
    ///
    /// # Arguments
    /// - `pass`           : name used in errors
    /// - `task_id`        : selects the chemical accuracy denominator
    /// - `elapsed_seconds`: wall-clock duration of the pass
    pub fn finish(&self, pass: &str, task_id: usize, elapsed_seconds: f64) -> Result<EpochResult> {
        if self.num_graphs == 0 {
            return Err(Error::EmptyEpoch(pass.to_string()));
        }
        let loss = self.mean_loss();
        let accuracy = self.mean_accuracy();
        if !loss.is_finite() || !accuracy.is_finite() {
            return Err(Error::Numerical(format!(
                "{} ended with loss {} and accuracy {}",
                pass, loss, accuracy
            )));
        }

        Ok(EpochResult {
            loss,
            accuracy,
            error_ratio: error_ratio(accuracy, task_id)?,
            instances_per_sec: self.num_graphs as f64 / elapsed_seconds.max(MIN_ELAPSED_SECONDS),
        })
    }
}

impl EpochResult {
    pub fn is_finite(&self) -> bool {
        self.loss.is_finite()
            && self.accuracy.is_finite()
            && self.error_ratio.is_finite()
            && self.instances_per_sec.is_finite()
    }
}

/// One entry of the run log, written after every completed epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochLogEntry {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Seconds since training started.
    pub time: f64,
    pub train_results: EpochResult,
    pub valid_results: EpochResult,
    pub valid_error_rate: f64,
}
