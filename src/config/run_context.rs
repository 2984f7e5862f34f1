use std::fs;
use std::path::PathBuf;

use chrono::Local;
use serde_json::{Map, Value};

use crate::config::resolve::{resolve_params, write_params};
use crate::config::run_config::RunConfig;
use crate::error::{Error, Result};

/// Where a run reads its data and writes its files, and how its parameters
/// are layered. Usually filled from the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    /// JSON object whose keys override the defaults.
    pub config_file: Option<PathBuf>,
    /// Inline JSON object whose keys override both defaults and file.
    pub config: Option<String>,
    /// Keep only this many leading records of every split (0 keeps all).
    pub restrict_data: Option<usize>,
}

/// One training run: its identifier, resolved parameters, and file layout.
#[derive(Debug)]
pub struct RunContext {
    run_id: String,
    options: RunOptions,
    params: Map<String, Value>,
    config: RunConfig,
}

impl RunContext {
    /// Resolves parameters (core defaults, then `model_defaults`, then the
    /// config file, then inline config), assigns a fresh run id, and writes
    /// `<run_id>_params.json` into the log directory.
    pub fn create(options: RunOptions, model_defaults: Map<String, Value>) -> Result<RunContext> {
        let mut defaults = RunConfig::default_params();
        defaults.extend(model_defaults);

        let params = resolve_params(
            defaults,
            options.config_file.as_deref(),
            options.config.as_deref(),
        )?;
        let config = RunConfig::from_params(&params)?;

        fs::create_dir_all(&options.log_dir).map_err(|e| Error::io(&options.log_dir, e))?;

        let context = RunContext {
            run_id: new_run_id(),
            options,
            params,
            config,
        };
        write_params(&context.params_file(), &context.params)?;

        log::info!(
            "Run {} starting with following parameters:\n{}",
            context.run_id,
            serde_json::to_string(&context.params)?
        );
        Ok(context)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// The resolved parameter map exactly as written to the params file.
    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn log_file(&self) -> PathBuf {
        self.options.log_dir.join(format!("{}_log.json", self.run_id))
    }

    pub fn params_file(&self) -> PathBuf {
        self.options.log_dir.join(format!("{}_params.json", self.run_id))
    }
}

/// `YYYY-MM-DD-HH-MM-SS_<pid>` from the local clock.
pub fn new_run_id() -> String {
    format!("{}_{}", Local::now().format("%Y-%m-%d-%H-%M-%S"), std::process::id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::resolve::read_params;
    use serde_json::json;

    #[test]
    fn run_id_carries_timestamp_and_pid() {
        let id = new_run_id();
        let (stamp, pid) = id.rsplit_once('_').unwrap();
        assert_eq!(pid, std::process::id().to_string());
        assert_eq!(stamp.len(), "2024-01-01-00-00-00".len());
        assert_eq!(stamp.split('-').count(), 6);
    }

    #[test]
    fn create_layers_model_defaults_under_inline_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut model_defaults = Map::new();
        model_defaults.insert("batch_size".into(), json!(32));
        model_defaults.insert("hidden_size".into(), json!(16));

        let options = RunOptions {
            log_dir: dir.path().join("logs"),
            config: Some(r#"{"batch_size": 8}"#.into()),
            ..RunOptions::default()
        };
        let context = RunContext::create(options, model_defaults).unwrap();

        assert_eq!(context.config().hidden_size, 16);
        assert_eq!(context.config().extra_usize("batch_size").unwrap(), Some(8));
        assert_eq!(read_params(&context.params_file()).unwrap(), *context.params());
        assert!(context.log_file().ends_with(format!("{}_log.json", context.run_id())));
    }

    #[test]
    fn invalid_parameters_abort_before_any_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions {
            log_dir: dir.path().to_path_buf(),
            config: Some(r#"{"task_id": 40}"#.into()),
            ..RunOptions::default()
        };
        assert!(RunContext::create(options, Map::new()).is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
