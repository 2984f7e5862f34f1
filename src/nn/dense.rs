use rand::Rng;

use crate::{math::matrix::Matrix, activation::activation::ActivationFunction};

/// Fully connected layer operating on a batch of rows: `a = σ(x · W + b)`.
#[derive(Debug, Clone)]
pub struct Layer {
    pub weights: Matrix,
    pub biases: Matrix,
    pub activator: ActivationFunction,
    inputs: Matrix,       // inputs of the last forward pass (after dropout)
    pre_neurons: Matrix,  // pre-activation values (z = xW + b) needed for correct derivative
}

/// Gradients of one layer for the batch seen by the last forward pass.
#[derive(Debug, Clone)]
pub struct LayerGradients {
    pub weights: Matrix,
    pub biases: Matrix,
    /// ∂L/∂x, the delta to hand to whatever produced this layer's input.
    pub input_delta: Matrix,
}

impl Layer {
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Layer {
        Layer {
            weights: Matrix::xavier(input_size, size, rng),
            biases: Matrix::zeros(1, size),
            activator: activation,
            inputs: Matrix::zeros(0, input_size),
            pre_neurons: Matrix::zeros(0, size),
        }
    }

    pub fn feed_from(&mut self, input: Matrix) -> Matrix {
        let z = input.matmul(&self.weights).add_row(&self.biases);
        let a = z.map(|x| self.activator.function(x));
        self.inputs = input;
        self.pre_neurons = z;
        a
    }

    /// Backpropagates `output_delta` (∂L/∂a, one row per input row) through
    /// the layer cached by the last `feed_from`.
    pub fn compute_gradients(&self, output_delta: &Matrix) -> LayerGradients {
        // Use pre-activation z so that derivative(z) = σ'(z) is computed correctly
        let act_derivative = self.pre_neurons.map(|x| self.activator.derivative(x));
        let layer_delta = output_delta.hadamard(&act_derivative);

        LayerGradients {
            weights: self.inputs.transpose().matmul(&layer_delta),
            biases: layer_delta.column_sums(),
            input_delta: layer_delta.matmul(&self.weights.transpose()),
        }
    }
}
