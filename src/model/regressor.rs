use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::run_config::RunConfig;
use crate::data::schema::DatasetSchema;
use crate::error::{Error, Result};
use crate::loss::mae::MaeLoss;
use crate::loss::mse::HalfMseLoss;
use crate::model::core::{GraphModel, MinibatchIter};
use crate::model::minibatch::Minibatch;
use crate::model::readout::GatedReadout;
use crate::nn::gradients::GradientSet;
use crate::optim::optimizer::{apply_gradients, Optimizer};

/// What a single `run_step` should do with a minibatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    /// Loss and accuracy only.
    Evaluate,
    /// Loss and accuracy, then one clipped optimizer step.
    Train,
}

/// Loss and accuracy of one minibatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutput {
    /// mean(0.5 · (prediction − target)²)
    pub loss: f64,
    /// mean(|prediction − target|)
    pub accuracy: f64,
}

/// A graph model wired to the shared readout, loss, and optimizer.
pub struct GraphRegressor<M: GraphModel> {
    model: M,
    readout: GatedReadout,
    optimizer: Box<dyn Optimizer>,
    clamp_gradient_norm: f64,
    schema: DatasetSchema,
}

impl<M: GraphModel> GraphRegressor<M> {
    pub fn build(model: M, schema: DatasetSchema, config: &RunConfig) -> Result<Self> {
        Self::build_with_rng(model, schema, config, &mut StdRng::from_entropy())
    }

    /// Builds the model in a fixed order: model-specific preparation first,
    /// then the shared readout weights, then the optimizer.
    pub fn build_with_rng(
        mut model: M,
        schema: DatasetSchema,
        config: &RunConfig,
        rng: &mut StdRng,
    ) -> Result<Self> {
        model.prepare_specific_model(&schema)?;
        let readout = GatedReadout::new(config.hidden_size, rng);
        let model_names: Vec<String> = model.parameters_mut().into_iter().map(|(name, _)| name).collect();
        log::debug!(
            "trainable parameters: {}",
            model_names.iter().chain(&readout.parameter_names()).cloned().collect::<Vec<_>>().join(", ")
        );

        Ok(GraphRegressor {
            model,
            readout,
            optimizer: config.optimizer.build(config.learning_rate),
            clamp_gradient_norm: config.clamp_gradient_norm,
            schema,
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    pub fn readout(&self) -> &GatedReadout {
        &self.readout
    }

    pub fn make_minibatch_iterator(&self, data: Arc<M::Dataset>, is_training: bool) -> MinibatchIter<M::Batch> {
        self.model.make_minibatch_iterator(data, is_training)
    }

    /// Predictions for one minibatch, one per graph.
    pub fn predict(&mut self, batch: &Minibatch<M::Batch>) -> Result<Vec<f64>> {
        let representations = self.model.compute_final_node_representations(&batch.payload)?;
        let predictions = self.model.gated_regression(
            &representations,
            &mut self.readout,
            batch.dropout_keep_prob,
        )?;

        if predictions.len() != batch.num_graphs || batch.target_values.len() != batch.num_graphs {
            return Err(Error::Model(format!(
                "minibatch declares {} graphs but has {} targets and {} predictions",
                batch.num_graphs,
                batch.target_values.len(),
                predictions.len()
            )));
        }
        Ok(predictions)
    }

    /// Runs one minibatch; in `Train` mode also backpropagates through the
    /// readout into the model, clips gradients per parameter to
    /// `clamp_gradient_norm` and applies one optimizer step to the
    /// parameters of both.
    pub fn run_step(&mut self, batch: &Minibatch<M::Batch>, mode: StepMode) -> Result<StepOutput> {
        if batch.num_graphs == 0 {
            return Err(Error::Model("minibatch contains no graphs".into()));
        }

        let predictions = self.predict(batch)?;
        let targets = &batch.target_values;
        let output = StepOutput {
            loss: HalfMseLoss::loss(&predictions, targets),
            accuracy: MaeLoss::loss(&predictions, targets),
        };

        if mode == StepMode::Train {
            let d_predictions = HalfMseLoss::derivative(&predictions, targets);
            let readout_grads = self.readout.backward(&d_predictions)?;
            let mut computed = self.model.backward(&batch.payload, &readout_grads.node_deltas)?;
            computed.extend(readout_grads.parameters);

            let names: Vec<String> = self.model.parameters_mut().into_iter()
                .map(|(name, _)| name)
                .chain(self.readout.parameter_names())
                .collect();
            let grads = GradientSet::collect(names, computed).clip_by_norm(self.clamp_gradient_norm);

            let mut params = self.model.parameters_mut();
            params.extend(self.readout.parameters_mut());
            apply_gradients(self.optimizer.as_mut(), params, &grads);
        }

        Ok(output)
    }
}
