use serde::{Serialize, Deserialize};
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::optim::optimizer::OptimizerKind;
use crate::train::reference::CHEMICAL_ACCURACY;

/// Fully resolved hyperparameters of one run.
///
/// Keys the core does not know about (model-specific ones such as
/// `batch_size`) are kept in `extra` so they survive into the params file
/// and can be read back by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Exclusive upper bound on the epoch index: `num_epochs - 1` epochs run.
    pub num_epochs: usize,
    pub patience: usize,
    pub learning_rate: f64,
    pub clamp_gradient_norm: f64,
    pub dropout_keep_prob: f64,
    pub hidden_size: usize,
    pub num_timesteps: usize,
    pub tie_fwd_bkwd: bool,
    pub task_id: usize,
    #[serde(default)]
    pub optimizer: OptimizerKind,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RunConfig {
    /// The core's default parameter layer.
    pub fn default_params() -> Map<String, Value> {
        let defaults = json!({
            "num_epochs": 3000,
            "patience": 25,
            "learning_rate": 0.0001,
            "clamp_gradient_norm": 1.0,
            "dropout_keep_prob": 1.0,

            "hidden_size": 100,
            "num_timesteps": 4,

            "tie_fwd_bkwd": true,
            "task_id": 0,
            "optimizer": "adam",
        });
        match defaults {
            Value::Object(map) => map,
            _ => unreachable!("json! object literal"),
        }
    }

    /// Reads a typed config out of a resolved parameter map and validates it.
    pub fn from_params(params: &Map<String, Value>) -> Result<RunConfig> {
        let config: RunConfig = serde_json::from_value(Value::Object(params.clone()))
            .map_err(|e| Error::Config(format!("cannot read parameters: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_epochs == 0 {
            return Err(Error::Config("num_epochs must be at least 1".into()));
        }
        if self.hidden_size == 0 {
            return Err(Error::Config("hidden_size must be at least 1".into()));
        }
        if !(self.dropout_keep_prob > 0.0 && self.dropout_keep_prob <= 1.0) {
            return Err(Error::Config(format!(
                "dropout_keep_prob must be in (0, 1], got {}",
                self.dropout_keep_prob
            )));
        }
        if !(self.clamp_gradient_norm > 0.0) {
            return Err(Error::Config(format!(
                "clamp_gradient_norm must be positive, got {}",
                self.clamp_gradient_norm
            )));
        }
        if !(self.learning_rate > 0.0) {
            return Err(Error::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.task_id >= CHEMICAL_ACCURACY.len() {
            return Err(Error::Config(format!(
                "task_id {} has no chemical accuracy reference (tasks 0..{})",
                self.task_id,
                CHEMICAL_ACCURACY.len()
            )));
        }
        Ok(())
    }

    /// A model-specific positive integer parameter.
    pub fn extra_usize(&self, key: &str) -> Result<Option<usize>> {
        match self.extra.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v.as_u64()
                .map(|n| Some(n as usize))
                .ok_or_else(|| Error::Config(format!("{} must be a non-negative integer, got {}", key, v))),
        }
    }
}
