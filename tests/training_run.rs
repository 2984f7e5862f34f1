use std::fs;
use std::path::Path;

use serde_json::{json, Value};

use ferrite_chem::config::read_params;
use ferrite_chem::model::GraphModel;
use ferrite_chem::train::{RunLog, StopReason};
use ferrite_chem::{run_training, Error, MeanFieldModel, RunContext, RunOptions};

/// Small chain molecules; the target grows with the chain length.
fn split(n: usize, offset: usize) -> Value {
    let graphs: Vec<Value> = (0..n)
        .map(|i| {
            let len = 2 + (i + offset) % 4;
            let edges: Vec<Value> = (0..len - 1)
                .map(|v| json!([v, 1 + v % 2, v + 1]))
                .collect();
            let features: Vec<Value> = (0..len)
                .map(|v| if v % 2 == 0 { json!([1.0, 0.0]) } else { json!([0.0, 1.0]) })
                .collect();
            json!({
                "graph": edges,
                "node_features": features,
                "targets": [[0.1 * len as f64]],
            })
        })
        .collect();
    Value::Array(graphs)
}

fn write_splits(dir: &Path) {
    fs::write(dir.join("molecules_train.json"), split(12, 0).to_string()).unwrap();
    fs::write(dir.join("molecules_valid.json"), split(5, 1).to_string()).unwrap();
}

fn options(data: &Path, logs: &Path, inline: &str) -> RunOptions {
    RunOptions {
        data_dir: data.to_path_buf(),
        log_dir: logs.to_path_buf(),
        config_file: None,
        config: Some(inline.to_string()),
        restrict_data: None,
    }
}

#[test]
fn full_run_writes_params_and_per_epoch_log() {
    let data = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    write_splits(data.path());

    let inline = r#"{"num_epochs": 4, "patience": 50, "hidden_size": 4, "batch_size": 5, "learning_rate": 0.01}"#;
    let context = RunContext::create(options(data.path(), logs.path(), inline), MeanFieldModel::default_params())
        .unwrap();
    let model = MeanFieldModel::new(context.config()).unwrap();

    let outcome = run_training(&context, model, "molecules_train.json", "molecules_valid.json").unwrap();
    assert_eq!(outcome.epochs_run, 3);
    assert_eq!(outcome.stop_reason, StopReason::Exhausted);
    assert!(outcome.best_epoch >= 1);

    let params = read_params(&context.params_file()).unwrap();
    assert_eq!(&params, context.params());
    assert_eq!(params["hidden_size"], 4);
    assert_eq!(params["patience"], 50);
    assert_eq!(params["clamp_gradient_norm"], 1.0);

    let entries = RunLog::read(&context.log_file()).unwrap();
    assert_eq!(entries.iter().map(|e| e.epoch).collect::<Vec<_>>(), vec![1, 2, 3]);
    for pair in entries.windows(2) {
        assert!(pair[1].time >= pair[0].time);
    }
    let best = entries.iter().map(|e| e.valid_results.accuracy).fold(f64::INFINITY, f64::min);
    assert!((best - outcome.best_valid_accuracy).abs() < 1e-12);

    let raw: Value = serde_json::from_str(&fs::read_to_string(context.log_file()).unwrap()).unwrap();
    assert_eq!(raw[0]["train_results"].as_array().unwrap().len(), 4);
    assert_eq!(raw[0]["valid_error_rate"], raw[0]["valid_results"][2]);
}

#[test]
fn malformed_split_stops_the_run_before_training() {
    let data = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    write_splits(data.path());
    fs::write(data.path().join("molecules_valid.json"), r#"[{"graph": [[0, 1, 1]]}]"#).unwrap();

    let context = RunContext::create(
        options(data.path(), logs.path(), r#"{"num_epochs": 3, "hidden_size": 2}"#),
        MeanFieldModel::default_params(),
    ).unwrap();
    let model = MeanFieldModel::new(context.config()).unwrap();

    let err = run_training(&context, model, "molecules_train.json", "molecules_valid.json").unwrap_err();
    assert!(matches!(err, Error::DataFormat { .. }));
    assert!(!context.log_file().exists());
    assert!(context.params_file().exists());
}

#[test]
fn restricted_run_uses_file_then_inline_layers() {
    let data = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    write_splits(data.path());

    let config_file = data.path().join("config.json");
    fs::write(&config_file, r#"{"hidden_size": 3, "num_epochs": 10, "task_id": 2}"#).unwrap();

    let context = RunContext::create(
        RunOptions {
            data_dir: data.path().to_path_buf(),
            log_dir: logs.path().join("nested"),
            config_file: Some(config_file),
            config: Some(r#"{"num_epochs": 2}"#.into()),
            restrict_data: Some(3),
        },
        MeanFieldModel::default_params(),
    ).unwrap();

    let config = context.config();
    assert_eq!((config.hidden_size, config.num_epochs, config.task_id), (3, 2, 2));
    assert_eq!(context.params()["batch_size"], 128);

    let model = MeanFieldModel::new(context.config()).unwrap();
    let err = run_training(&context, model, "molecules_train.json", "molecules_valid.json").unwrap_err();
    // The chain records only carry a target for task 0.
    assert!(matches!(err, Error::Model(_)));
}
