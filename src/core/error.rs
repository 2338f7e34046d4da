//! Error types for tabml

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TabmlError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Select at least one model")]
    NoModelsSelected,

    #[error("Model '{model}' is not available for {problem} problems")]
    ModelProblemMismatch { model: String, problem: String },

    #[error("A target column is required for {0} problems")]
    MissingTarget(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("Training failed: {0}")]
    Training(String),

    #[error("Prediction is not supported by {0}")]
    PredictionUnsupported(String),

    #[error("Remote '{0}' is not configured for this repository")]
    MissingRemote(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Data error: {0}")]
    DataError(#[from] polars::error::PolarsError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Git error: {0}")]
    GitError(#[from] git2::Error),
}

impl From<smartcore::error::Failed> for TabmlError {
    fn from(failed: smartcore::error::Failed) -> Self {
        TabmlError::Training(failed.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TabmlError>;
