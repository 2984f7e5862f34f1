use rand::Rng;

use crate::activation::activation::ActivationFunction;
use crate::math::matrix::Matrix;
use crate::nn::dense::Layer;

/// Small feed-forward network: ReLU hidden layers, linear output layer.
///
/// Each layer's input goes through inverted dropout when the forward pass is
/// given a keep probability below 1.0; the masks are kept so that `backward`
/// differentiates exactly the function that was evaluated.
#[derive(Debug, Clone)]
pub struct Mlp {
    name: String,
    layers: Vec<Layer>,
    dropout_masks: Vec<Option<Matrix>>,
}

/// Output of `Mlp::backward`.
#[derive(Debug, Clone)]
pub struct MlpGradients {
    /// Weight and bias gradients in `parameter_names()` order.
    pub parameters: Vec<(String, Matrix)>,
    /// ∂L/∂input, one row per input row.
    pub input_delta: Matrix,
}

impl Mlp {
    /// Builds `in_size → hidden_sizes… → out_size`.
    pub fn new<R: Rng + ?Sized>(
        name: impl Into<String>,
        in_size: usize,
        out_size: usize,
        hidden_sizes: &[usize],
        rng: &mut R,
    ) -> Mlp {
        let mut widths = Vec::with_capacity(hidden_sizes.len() + 2);
        widths.push(in_size);
        widths.extend_from_slice(hidden_sizes);
        widths.push(out_size);

        let last = widths.len() - 2;
        let layers: Vec<Layer> = widths.windows(2)
            .enumerate()
            .map(|(i, w)| {
                let activation = if i == last {
                    ActivationFunction::Identity
                } else {
                    ActivationFunction::ReLU
                };
                Layer::new(w[0], w[1], activation, rng)
            })
            .collect();

        Mlp {
            name: name.into(),
            dropout_masks: vec![None; layers.len()],
            layers,
        }
    }

    /// Forward pass over a batch of rows; caches activations for `backward`.
    pub fn forward<R: Rng + ?Sized>(
        &mut self,
        input: &Matrix,
        dropout_keep_prob: f64,
        rng: &mut R,
    ) -> Matrix {
        let mut current = input.clone();
        for (layer, mask_slot) in self.layers.iter_mut().zip(self.dropout_masks.iter_mut()) {
            if dropout_keep_prob < 1.0 {
                let mask = dropout_mask(current.rows, current.cols, dropout_keep_prob, rng);
                current = current.hadamard(&mask);
                *mask_slot = Some(mask);
            } else {
                *mask_slot = None;
            }
            current = layer.feed_from(current);
        }
        current
    }

    /// Gradients of every weight and bias given ∂L/∂output for the batch of
    /// the last forward pass, plus the delta for the network input.
    pub fn backward(&self, output_delta: &Matrix) -> MlpGradients {
        let mut grads = Vec::with_capacity(self.layers.len() * 2);
        let mut delta = output_delta.clone();

        for i in (0..self.layers.len()).rev() {
            let layer_grads = self.layers[i].compute_gradients(&delta);
            grads.push((self.weights_name(i), layer_grads.weights));
            grads.push((self.biases_name(i), layer_grads.biases));

            delta = match &self.dropout_masks[i] {
                Some(mask) => layer_grads.input_delta.hadamard(mask),
                None => layer_grads.input_delta,
            };
        }

        grads.reverse();
        MlpGradients {
            parameters: grads,
            input_delta: delta,
        }
    }

    pub fn parameter_names(&self) -> Vec<String> {
        (0..self.layers.len())
            .flat_map(|i| [self.weights_name(i), self.biases_name(i)])
            .collect()
    }

    /// Mutable access to every trainable matrix, paired with its name.
    pub fn parameters_mut(&mut self) -> Vec<(String, &mut Matrix)> {
        let names = self.parameter_names();
        let mut out = Vec::with_capacity(names.len());
        let mut names = names.into_iter();
        for layer in self.layers.iter_mut() {
            if let (Some(w), Some(b)) = (names.next(), names.next()) {
                out.push((w, &mut layer.weights));
                out.push((b, &mut layer.biases));
            }
        }
        out
    }

    fn weights_name(&self, i: usize) -> String {
        format!("{}/layer{}/weights", self.name, i)
    }

    fn biases_name(&self, i: usize) -> String {
        format!("{}/layer{}/biases", self.name, i)
    }
}

/// Inverted-dropout mask: entries are `1 / keep` with probability `keep`, else 0.
fn dropout_mask<R: Rng + ?Sized>(rows: usize, cols: usize, keep: f64, rng: &mut R) -> Matrix {
    let scale = 1.0 / keep;
    let mut mask = Matrix::zeros(rows, cols);
    for x in mask.data.iter_mut().flatten() {
        if rng.gen::<f64>() < keep {
            *x = scale;
        }
    }
    mask
}
