use crate::error::{Error, Result};

/// Per-task "chemical accuracy": the error a prediction may carry and still
/// be chemically useful. Dividing a mean absolute error by it gives the
/// error ratio reported each epoch.
pub const CHEMICAL_ACCURACY: [f64; 13] = [
    0.066513725, 0.012235489, 0.071939046, 0.033730778, 0.033486113, 0.004278493, 0.001330901,
    0.004165489, 0.004128926, 0.00409976, 0.004527465, 0.012292586, 0.037467458,
];

/// `accuracy / CHEMICAL_ACCURACY[task_id]`.
pub fn error_ratio(accuracy: f64, task_id: usize) -> Result<f64> {
    CHEMICAL_ACCURACY.get(task_id)
        .map(|reference| accuracy / reference)
        .ok_or_else(|| Error::Config(format!("no chemical accuracy reference for task {}", task_id)))
}
