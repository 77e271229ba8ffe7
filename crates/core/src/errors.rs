//! Error types for the Feralyx core

use crate::pipeline::PipelineKind;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while preparing data, predicting, or persisting pipelines
#[derive(Error, Debug)]
pub enum AgroError {
    /// Dataset has no rows
    #[error("dataset is empty")]
    EmptyDataset,

    /// A required column is absent from a dataset or observation
    #[error("missing required column '{column}'")]
    MissingColumn { column: String },

    /// A column holds a value of the wrong shape (e.g. text where a number is expected)
    #[error("column '{column}' holds invalid value '{value}'")]
    InvalidValue { column: String, value: String },

    /// A categorical value was not seen when the encoder was fitted
    #[error("unknown category '{value}' for column '{column}'")]
    UnknownCategory { column: String, value: String },

    /// Feature vector width does not match the fitted width
    #[error("feature width mismatch: expected {expected}, got {actual}")]
    FeatureWidthMismatch { expected: usize, actual: usize },

    /// Prediction requested before training or loading
    #[error("{model} model is not trained (train or load it first)")]
    NotTrained { model: PipelineKind },

    /// Irrigation was decided but the quantity model was never fitted
    #[error("irrigation decided but no quantity model was fitted (no positive rows at training time)")]
    QuantityModelUnavailable,

    /// Model store read/write or integrity failure
    #[error("model store error for {}: {reason}", .path.display())]
    Persistence { path: PathBuf, reason: String },

    /// Fitting could not proceed (e.g. a single distinct label)
    #[error("training failed: {0}")]
    Training(String),

    /// Structurally invalid model (bad node references, empty ensemble)
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AgroError {
    pub(crate) fn missing(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }

    pub(crate) fn persistence(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Persistence {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, AgroError>;
