use std::collections::HashMap;

use crate::math::matrix::Matrix;
use crate::optim::optimizer::Optimizer;

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-8;

/// First and second moment estimates for one parameter.
#[derive(Debug)]
struct Moments {
    v: Matrix,
    s: Matrix,
}

/// Adam with bias correction folded into the step size.
#[derive(Debug)]
pub struct Adam {
    learning_rate: f64,
    beta1_t: f64,
    beta2_t: f64,
    moments: HashMap<String, Moments>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1_t: 1.,
            beta2_t: 1.,
            moments: HashMap::new(),
        }
    }
}

impl Optimizer for Adam {
    fn begin_step(&mut self) {
        self.beta1_t *= BETA1;
        self.beta2_t *= BETA2;
    }

    fn update(&mut self, name: &str, param: &mut Matrix, grad: &Matrix) {
        let bc1 = 1. - self.beta1_t;
        let bc2 = 1. - self.beta2_t;
        let step_size = self.learning_rate * (bc2.sqrt() / bc1);

        let Moments { v, s } = self.moments
            .entry(name.to_string())
            .or_insert_with(|| Moments {
                v: Matrix::zeros(param.rows, param.cols),
                s: Matrix::zeros(param.rows, param.cols),
            });

        for (((p_row, g_row), v_row), s_row) in param.data.iter_mut()
            .zip(&grad.data)
            .zip(v.data.iter_mut())
            .zip(s.data.iter_mut())
        {
            for (((p, g), v), s) in p_row.iter_mut().zip(g_row).zip(v_row.iter_mut()).zip(s_row.iter_mut()) {
                *v = BETA1 * *v + (1. - BETA1) * g;
                *s = BETA2 * *s + (1. - BETA2) * g.powi(2);
                *p -= step_size * *v / (s.sqrt() + EPSILON);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::gradients::GradientSet;
    use crate::optim::optimizer::apply_gradients;

    #[test]
    fn first_step_moves_by_learning_rate() {
        let mut adam = Adam::new(0.1);
        let mut p = Matrix::from_data(vec![vec![1.0, -1.0]]);
        adam.begin_step();
        adam.update("p", &mut p, &Matrix::from_data(vec![vec![4.0, -0.5]]));
        // With bias correction the first update is lr · sign(g).
        assert!((p.data[0][0] - 0.9).abs() < 1e-6);
        assert!((p.data[0][1] + 0.9).abs() < 1e-6);
    }

    #[test]
    fn absent_gradients_leave_parameters_alone() {
        let mut adam = Adam::new(0.1);
        let mut used = Matrix::from_data(vec![vec![1.0]]);
        let mut unused = Matrix::from_data(vec![vec![1.0]]);
        let grads = GradientSet::collect(
            vec!["used".to_string(), "unused".to_string()],
            vec![("used".to_string(), Matrix::from_data(vec![vec![1.0]]))],
        );

        let updated = apply_gradients(
            &mut adam,
            vec![("used".to_string(), &mut used), ("unused".to_string(), &mut unused)],
            &grads,
        );

        assert_eq!(updated, 1);
        assert!(used.data[0][0] < 1.0);
        assert_eq!(unused.data[0][0], 1.0);
    }
}
