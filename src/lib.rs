pub mod activation;
pub mod config;
pub mod data;
pub mod error;
pub mod loss;
pub mod math;
pub mod model;
pub mod nn;
pub mod optim;
pub mod train;

// Convenience re-exports
pub use error::{Error, Result};
pub use config::{RunConfig, RunContext, RunOptions};
pub use data::{DatasetLoader, DatasetSchema, GraphRecord, SchemaAccumulator};
pub use math::matrix::Matrix;
pub use model::{GraphModel, GraphRegressor, MeanFieldModel, Minibatch};
pub use train::{run_training, MinibatchStreamer, Trainer, TrainingOutcome};
