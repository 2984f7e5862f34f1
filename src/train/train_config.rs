use std::sync::mpsc;

use crate::config::run_config::RunConfig;
use crate::train::epoch_stats::EpochLogEntry;

/// The parts of a `RunConfig` the training loop reads, plus an optional
/// progress channel.
///
/// # Fields
/// - `num_epochs`       : exclusive upper bound; epochs `1..num_epochs` run
/// - `patience`         : epochs without improvement tolerated before stopping
/// - `dropout_keep_prob`: fed to training batches; evaluation always uses 1.0
/// - `task_id`          : selects the chemical accuracy reference
/// - `progress_tx`      : optional sender; one `EpochLogEntry` per completed
///                        epoch. A dropped receiver is ignored.
pub struct TrainConfig {
    pub num_epochs: usize,
    pub patience: usize,
    pub dropout_keep_prob: f64,
    pub task_id: usize,
    pub progress_tx: Option<mpsc::Sender<EpochLogEntry>>,
}

impl TrainConfig {
    pub fn from_run_config(config: &RunConfig) -> Self {
        TrainConfig {
            num_epochs: config.num_epochs,
            patience: config.patience,
            dropout_keep_prob: config.dropout_keep_prob,
            task_id: config.task_id,
            progress_tx: None,
        }
    }
}
