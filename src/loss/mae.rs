/// Mean absolute error. Reported as the "accuracy" of a regression pass
/// (lower is better).
pub struct MaeLoss;

impl MaeLoss {
    /// Scalar MAE: mean(|predicted - expected|)
    pub fn loss(predicted: &[f64], expected: &[f64]) -> f64 {
        let n = predicted.len() as f64;
        predicted.iter().zip(expected.iter())
            .map(|(p, y)| (p - y).abs())
            .sum::<f64>() / n
    }
}
