pub mod early_stop;
pub mod epoch_stats;
pub mod loop_fn;
pub mod reference;
pub mod run_log;
pub mod session;
pub mod streamer;
pub mod train_config;

pub use early_stop::{EarlyStopping, Verdict};
pub use epoch_stats::{EpochAccumulator, EpochLogEntry, EpochResult};
pub use loop_fn::{StopReason, Trainer, TrainingOutcome};
pub use reference::{error_ratio, CHEMICAL_ACCURACY};
pub use run_log::RunLog;
pub use session::run_training;
pub use streamer::{MinibatchStreamer, QUEUE_CAPACITY};
pub use train_config::TrainConfig;
