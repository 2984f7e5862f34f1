use std::sync::Arc;

use serde_json::{Map, Value};

use crate::data::record::GraphRecord;
use crate::data::schema::DatasetSchema;
use crate::error::Result;
use crate::math::matrix::Matrix;
use crate::model::minibatch::Minibatch;
use crate::model::readout::GatedReadout;

/// Lazily produced minibatches. Runs on the streamer's worker thread.
pub type MinibatchIter<B> = Box<dyn Iterator<Item = Result<Minibatch<B>>> + Send>;

/// Node states of one graph, one row per node, `hidden_size` columns each.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeStates {
    /// States before propagation (annotations padded to `hidden_size`).
    pub initial: Matrix,
    /// States after the last propagation step.
    pub last: Matrix,
}

/// Output of graph propagation for every graph of a minibatch.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRepresentations {
    pub hidden_size: usize,
    pub graphs: Vec<NodeStates>,
}

/// The extension points a graph architecture implements.
///
/// `GraphRegressor` drives a model through these hooks: records pass
/// through `process_raw_graphs` at load time, `prepare_specific_model` runs
/// once the schema is final, and every minibatch goes through
/// `compute_final_node_representations` then `gated_regression`. Training
/// steps then call `backward` and update `parameters_mut`.
pub trait GraphModel: Send {
    /// Processed form of one split.
    type Dataset: Send + Sync + 'static;
    /// Model-specific part of a minibatch.
    type Batch: Send + 'static;

    /// Extra default parameters, layered over the core defaults and under
    /// any config file or inline config.
    fn default_params() -> Map<String, Value>
    where
        Self: Sized,
    {
        Map::new()
    }

    /// Turns raw records into this model's representation. `schema` covers
    /// every split loaded so far, including this one.
    fn process_raw_graphs(&self, raw: Vec<GraphRecord>, schema: &DatasetSchema) -> Result<Self::Dataset>;

    /// Declares model-specific state once the final schema is known.
    fn prepare_specific_model(&mut self, schema: &DatasetSchema) -> Result<()>;

    /// Propagates information along the edges of every graph in `batch`.
    fn compute_final_node_representations(&self, batch: &Self::Batch) -> Result<NodeRepresentations>;

    /// Reduces node states to one prediction per graph using the shared
    /// gate (`2·hidden → 1`) and transform (`hidden → 1`) networks.
    fn gated_regression(
        &self,
        representations: &NodeRepresentations,
        readout: &mut GatedReadout,
        dropout_keep_prob: f64,
    ) -> Result<Vec<f64>>;

    /// Splits a dataset into minibatches; the model owns ordering and
    /// shuffling.
    fn make_minibatch_iterator(&self, data: Arc<Self::Dataset>, is_training: bool) -> MinibatchIter<Self::Batch>;

    /// The model's own trainable parameters, paired with unique names.
    /// They are registered alongside the readout's and updated by the same
    /// optimizer step. Parameter-free models keep the default.
    fn parameters_mut(&mut self) -> Vec<(String, &mut Matrix)> {
        Vec::new()
    }

    /// Gradients of the model's parameters for `batch`, given ∂L/∂ node
    /// states from the readout. A parameter missing from the result is
    /// treated as unused by the loss and left alone.
    fn backward(
        &self,
        _batch: &Self::Batch,
        _node_deltas: &NodeRepresentations,
    ) -> Result<Vec<(String, Matrix)>> {
        Ok(Vec::new())
    }
}
