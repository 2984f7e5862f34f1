use crate::config::run_context::RunContext;
use crate::data::loader::DatasetLoader;
use crate::data::schema::SchemaAccumulator;
use crate::error::Result;
use crate::model::core::GraphModel;
use crate::model::regressor::GraphRegressor;
use crate::train::loop_fn::{Trainer, TrainingOutcome};
use crate::train::run_log::RunLog;
use crate::train::train_config::TrainConfig;

/// Loads both splits, builds the regressor on the combined schema, and
/// trains it, logging to the context's run log file.
pub fn run_training<M: GraphModel>(
    context: &RunContext,
    model: M,
    train_file: &str,
    valid_file: &str,
) -> Result<TrainingOutcome> {
    let loader = DatasetLoader::from_context(context);
    let (train_data, schema) = loader.load(train_file, &model, SchemaAccumulator::new())?;
    let (valid_data, schema) = loader.load(valid_file, &model, schema)?;
    let schema = schema.schema();
    log::info!(
        "Schema: {} vertices max, {} edge types, annotation size {}",
        schema.max_num_vertices,
        schema.num_edge_types,
        schema.annotation_size
    );

    let regressor = GraphRegressor::build(model, schema, context.config())?;
    let mut trainer = Trainer::new(
        regressor,
        train_data,
        valid_data,
        TrainConfig::from_run_config(context.config()),
        RunLog::new(context.log_file()),
    );

    log::info!("Training log written to {}", context.log_file().display());
    trainer.train()
}
