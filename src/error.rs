use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every way a training run can fail.
///
/// None of these are retried: they bubble up to the run driver, which stops
/// the process. The last log entry written before the failure remains the
/// most recent consistent snapshot.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A loaded record is missing required fields or is internally inconsistent.
    #[error("malformed data in {}: {reason}", path.display())]
    DataFormat { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The minibatch worker failed (or panicked) while preparing a batch.
    #[error("minibatch producer failed: {0}")]
    Producer(String),

    /// A pass finished without processing a single graph, so no mean exists.
    #[error("{0} processed no graphs")]
    EmptyEpoch(String),

    /// A pass produced a non-finite loss or accuracy; training diverged.
    #[error("numerical failure: {0}")]
    Numerical(String),

    /// A concrete model rejected its inputs.
    #[error("model error: {0}")]
    Model(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    pub(crate) fn data_format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::DataFormat { path: path.into(), reason: reason.into() }
    }
}
