/// Inputs of one forward/backward pass.
///
/// Produced on demand by a model's minibatch iterator, consumed once by the
/// regressor. `payload` is whatever the model needs to rebuild its graphs.
#[derive(Debug, Clone)]
pub struct Minibatch<B> {
    pub target_values: Vec<f64>,
    pub num_graphs: usize,
    /// Overwritten by the trainer: the configured value when training,
    /// 1.0 when evaluating.
    pub dropout_keep_prob: f64,
    pub payload: B,
}

impl<B> Minibatch<B> {
    pub fn new(target_values: Vec<f64>, payload: B) -> Self {
        Minibatch {
            num_graphs: target_values.len(),
            target_values,
            dropout_keep_prob: 1.0,
            payload,
        }
    }
}
