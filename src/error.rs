//! Error types for the estimator

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Rejected user input; no prediction is attempted
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The model could not produce a price for this request
    #[error("Prediction failed: {0}")]
    Prediction(String),

    /// The comparable-property lookup failed; the price itself is still valid
    #[error("Similar property lookup failed: {0}")]
    Filter(String),

    #[error("Dataset error: {0}")]
    Dataset(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model artifact error: {0}")]
    Artifact(#[from] bincode::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Plot error: {0}")]
    Plot(String),
}
