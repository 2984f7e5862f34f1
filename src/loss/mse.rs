/// Halved squared error, the training objective of the regressor.
pub struct HalfMseLoss;

impl HalfMseLoss {
    /// Scalar loss: mean(0.5 · (predicted - expected)²)
    pub fn loss(predicted: &[f64], expected: &[f64]) -> f64 {
        let n = predicted.len() as f64;
        predicted.iter().zip(expected.iter())
            .map(|(a, b)| 0.5 * (a - b).powi(2))
            .sum::<f64>() / n
    }

    /// ∂loss/∂predicted: (predicted - expected) / n
    pub fn derivative(predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        let n = predicted.len() as f64;
        predicted.iter().zip(expected.iter())
            .map(|(a, b)| (a - b) / n)
            .collect()
    }
}
