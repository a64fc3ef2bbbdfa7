//! Error types for the flood prediction pipeline

use thiserror::Error;

/// Errors surfaced by pipeline stages.
#[derive(Error, Debug)]
pub enum FloodcastError {
    /// Dataset file does not exist. Never retried by the loader.
    #[error("Dataset not found: {0}")]
    DataNotFound(String),

    #[error("Dataset is empty: {0}")]
    EmptyDataset(String),

    #[error("Target column '{0}' not found in dataset")]
    MissingTargetColumn(String),

    #[error("Feature column '{0}' not found")]
    MissingFeatureColumn(String),

    #[error("Null values present in {0}")]
    NullValuesPresent(String),

    #[error("Failed to fit model '{model}': {reason}")]
    ModelFit { model: String, reason: String },

    #[error("No trained models available for selection")]
    NoModelsAvailable,

    /// Inference input is missing required raw columns.
    #[error("Input schema mismatch, missing columns: {0:?}")]
    SchemaMismatch(Vec<String>),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Model is not fitted")]
    ModelNotFitted,

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DataFrame error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FloodcastError>;
