pub mod core;
pub mod mean_field;
pub mod minibatch;
pub mod readout;
pub mod regressor;

pub use self::core::{GraphModel, MinibatchIter, NodeRepresentations, NodeStates};
pub use mean_field::{MeanFieldBatch, MeanFieldGraph, MeanFieldModel};
pub use minibatch::Minibatch;
pub use readout::{GatedReadout, ReadoutGradients};
pub use regressor::{GraphRegressor, StepMode, StepOutput};
