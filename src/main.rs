use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;

use ferrite_chem::model::GraphModel;
use ferrite_chem::train::StopReason;
use ferrite_chem::{run_training, MeanFieldModel, RunContext, RunOptions};

#[derive(Parser, Debug)]
#[command(name = "ferrite-chem")]
#[command(about = "Train a gated graph regression model on molecule graphs")]
struct Args {
    /// Directory holding the training and validation splits
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Directory receiving <run_id>_params.json and <run_id>_log.json
    #[arg(long, default_value = "./")]
    log_dir: PathBuf,

    /// JSON file with parameters overriding the defaults
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Inline JSON object overriding defaults and config file
    #[arg(long)]
    config: Option<String>,

    /// Keep only this many leading graphs of each split (0 keeps all)
    #[arg(long)]
    restrict_data: Option<usize>,

    #[arg(long, default_value = "molecules_train.json")]
    train_file: String,

    #[arg(long, default_value = "molecules_valid.json")]
    valid_file: String,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let options = RunOptions {
        data_dir: args.data_dir,
        log_dir: args.log_dir,
        config_file: args.config_file,
        config: args.config,
        restrict_data: args.restrict_data,
    };
    let context = RunContext::create(options, MeanFieldModel::default_params())
        .context("could not set up the run")?;

    let model = MeanFieldModel::new(context.config())?;
    let outcome = run_training(&context, model, &args.train_file, &args.valid_file)
        .with_context(|| format!("run {} failed", context.run_id()))?;

    match outcome.stop_reason {
        StopReason::EarlyStopped => info!(
            "Early stop after epoch {}; best validation accuracy {:.5} at epoch {}",
            outcome.epochs_run, outcome.best_valid_accuracy, outcome.best_epoch
        ),
        StopReason::Exhausted => info!(
            "Finished {} epochs; best validation accuracy {:.5} at epoch {}",
            outcome.epochs_run, outcome.best_valid_accuracy, outcome.best_epoch
        ),
    }
    Ok(())
}
