use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;
use crate::nn::gradients::GradientSet;

/// Consumes (possibly clipped) gradients and updates parameters in place.
pub trait Optimizer: Send {
    /// Called once per training step, before any `update`.
    fn begin_step(&mut self) {}

    /// Applies one update to the parameter called `name`.
    fn update(&mut self, name: &str, param: &mut Matrix, grad: &Matrix);
}

/// Which optimizer a run uses; selected by the `optimizer` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    #[default]
    Adam,
    Sgd,
}

impl OptimizerKind {
    pub fn build(self, learning_rate: f64) -> Box<dyn Optimizer> {
        match self {
            OptimizerKind::Adam => Box::new(super::adam::Adam::new(learning_rate)),
            OptimizerKind::Sgd => Box::new(super::sgd::Sgd::new(learning_rate)),
        }
    }
}

/// Runs one optimizer step over `params`. Parameters whose gradient is
/// absent are left untouched. Returns how many parameters were updated.
pub fn apply_gradients<'a, I>(optimizer: &mut dyn Optimizer, params: I, grads: &GradientSet) -> usize
where
    I: IntoIterator<Item = (String, &'a mut Matrix)>,
{
    optimizer.begin_step();
    let mut updated = 0;
    for (name, param) in params {
        if let Some(grad) = grads.get(&name) {
            optimizer.update(&name, param, grad);
            updated += 1;
        }
    }
    updated
}
