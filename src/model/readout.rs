use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::activation::activation::sigmoid;
use crate::error::{Error, Result};
use crate::math::matrix::Matrix;
use crate::model::core::{NodeRepresentations, NodeStates};
use crate::nn::mlp::Mlp;

/// Gated sum readout shared by all models:
///
/// `y_g = Σ_{v ∈ g} σ(gate([h_v^T, h_v^0])) · transform(h_v^T)`
#[derive(Debug)]
pub struct GatedReadout {
    hidden_size: usize,
    gate: Mlp,
    transform: Mlp,
    rng: StdRng,
    cache: Option<ReadoutCache>,
}

/// Output of `GatedReadout::backward`.
#[derive(Debug, Clone)]
pub struct ReadoutGradients {
    /// Gradients of the gate and transform weights.
    pub parameters: Vec<(String, Matrix)>,
    /// ∂L/∂ node states, shaped like the representations given to `forward`.
    pub node_deltas: NodeRepresentations,
}

/// What `backward` needs from the last `forward`.
#[derive(Debug)]
struct ReadoutCache {
    /// Graph index of every stacked node row.
    segments: Vec<usize>,
    rows_per_graph: Vec<usize>,
    gates: Vec<f64>,
    transformed: Vec<f64>,
    num_graphs: usize,
}

impl GatedReadout {
    pub fn new<R: Rng + ?Sized>(hidden_size: usize, rng: &mut R) -> Self {
        GatedReadout {
            hidden_size,
            gate: Mlp::new("regression_gate", 2 * hidden_size, 1, &[], rng),
            transform: Mlp::new("regression_transform", hidden_size, 1, &[], rng),
            rng: StdRng::from_rng(rng).unwrap_or_else(|_| StdRng::seed_from_u64(0)),
            cache: None,
        }
    }

    /// One prediction per graph. A graph without nodes predicts 0.
    pub fn forward(&mut self, reps: &NodeRepresentations, dropout_keep_prob: f64) -> Result<Vec<f64>> {
        let h = self.hidden_size;
        if reps.hidden_size != h {
            return Err(Error::Model(format!(
                "node representations are {} wide, readout expects {}",
                reps.hidden_size, h
            )));
        }

        let mut segments = Vec::new();
        let mut gate_parts = Vec::with_capacity(reps.graphs.len());
        let mut last_parts = Vec::with_capacity(reps.graphs.len());
        for (g, states) in reps.graphs.iter().enumerate() {
            if states.last.cols != h || states.initial.cols != h || states.last.rows != states.initial.rows {
                return Err(Error::Model(format!(
                    "graph {} has inconsistent node states ({}x{} vs {}x{})",
                    g, states.last.rows, states.last.cols, states.initial.rows, states.initial.cols
                )));
            }
            segments.extend(std::iter::repeat(g).take(states.last.rows));
            gate_parts.push(states.last.hconcat(&states.initial));
            last_parts.push(states.last.clone());
        }

        let gate_input = Matrix::vstack(&gate_parts, 2 * h);
        let transform_input = Matrix::vstack(&last_parts, h);

        let gates: Vec<f64> = self.gate.forward(&gate_input, dropout_keep_prob, &mut self.rng)
            .data.iter().map(|row| sigmoid(row[0])).collect();
        let transformed: Vec<f64> = self.transform.forward(&transform_input, dropout_keep_prob, &mut self.rng)
            .data.iter().map(|row| row[0]).collect();

        let mut predictions = vec![0.0; reps.graphs.len()];
        for ((&g, gate), t) in segments.iter().zip(&gates).zip(&transformed) {
            predictions[g] += gate * t;
        }

        self.cache = Some(ReadoutCache {
            segments,
            rows_per_graph: reps.graphs.iter().map(|s| s.last.rows).collect(),
            gates,
            transformed,
            num_graphs: reps.graphs.len(),
        });
        Ok(predictions)
    }

    /// Named gradients of every readout weight and the deltas of both node
    /// state sets, given ∂L/∂prediction for the graphs of the last `forward`.
    pub fn backward(&self, d_predictions: &[f64]) -> Result<ReadoutGradients> {
        let cache = self.cache.as_ref()
            .ok_or_else(|| Error::Model("readout backward called before forward".into()))?;
        if d_predictions.len() != cache.num_graphs {
            return Err(Error::Model(format!(
                "{} prediction gradients for {} graphs",
                d_predictions.len(),
                cache.num_graphs
            )));
        }

        let n = cache.segments.len();
        let mut d_gate_logits = Vec::with_capacity(n);
        let mut d_transformed = Vec::with_capacity(n);
        for i in 0..n {
            let d_out = d_predictions[cache.segments[i]];
            let s = cache.gates[i];
            d_gate_logits.push(d_out * cache.transformed[i] * s * (1.0 - s));
            d_transformed.push(d_out * s);
        }

        let gate = self.gate.backward(&column_or_empty(&d_gate_logits));
        let transform = self.transform.backward(&column_or_empty(&d_transformed));

        // Gate input rows are [h_T, h_0]; transform input rows are h_T.
        let h = self.hidden_size;
        let mut graphs = Vec::with_capacity(cache.num_graphs);
        let mut offset = 0;
        for &rows in &cache.rows_per_graph {
            let gate_rows = gate.input_delta.slice_rows(offset, rows);
            graphs.push(NodeStates {
                initial: gate_rows.slice_cols(h, h),
                last: gate_rows.slice_cols(0, h) + transform.input_delta.slice_rows(offset, rows),
            });
            offset += rows;
        }

        let mut parameters = gate.parameters;
        parameters.extend(transform.parameters);
        Ok(ReadoutGradients {
            parameters,
            node_deltas: NodeRepresentations { hidden_size: h, graphs },
        })
    }

    pub fn parameter_names(&self) -> Vec<String> {
        let mut names = self.gate.parameter_names();
        names.extend(self.transform.parameter_names());
        names
    }

    pub fn parameters_mut(&mut self) -> Vec<(String, &mut Matrix)> {
        let mut params = self.gate.parameters_mut();
        params.extend(self.transform.parameters_mut());
        params
    }
}

fn column_or_empty(values: &[f64]) -> Matrix {
    if values.is_empty() {
        Matrix::zeros(0, 1)
    } else {
        Matrix::column(values)
    }
}
