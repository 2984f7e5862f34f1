use crate::math::matrix::Matrix;
use crate::optim::optimizer::Optimizer;

pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }
}

impl Optimizer for Sgd {
    /// Plain gradient descent: `θ ← θ − lr · g`.
    fn update(&mut self, _name: &str, param: &mut Matrix, grad: &Matrix) {
        *param = param.clone() - grad.scale(self.learning_rate);
    }
}
