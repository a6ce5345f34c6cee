//! Error types for the dropout-risk pipeline

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, RiskError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Schema mismatch: expected {expected}, got {actual}")]
    SchemaMismatch { expected: String, actual: String },

    #[error("Model not trained")]
    ModelNotTrained,

    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    #[error("Student not found: {0}")]
    StudentNotFound(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Stable discriminant of a [`RiskError`], used to tag per-item failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InsufficientData,
    SchemaMismatch,
    ModelNotTrained,
    InvalidLabel,
    StudentNotFound,
    InvalidParameter,
    Validation,
    Io,
    Serialization,
}

impl RiskError {
    /// Kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RiskError::InsufficientData(_) => ErrorKind::InsufficientData,
            RiskError::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            RiskError::ModelNotTrained => ErrorKind::ModelNotTrained,
            RiskError::InvalidLabel(_) => ErrorKind::InvalidLabel,
            RiskError::StudentNotFound(_) => ErrorKind::StudentNotFound,
            RiskError::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            RiskError::ValidationError(_) => ErrorKind::Validation,
            RiskError::IoError(_) => ErrorKind::Io,
            RiskError::SerializationError(_) => ErrorKind::Serialization,
        }
    }

    pub(crate) fn schema(expected: impl std::fmt::Display, actual: impl std::fmt::Display) -> Self {
        RiskError::SchemaMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

impl From<serde_json::Error> for RiskError {
    fn from(err: serde_json::Error) -> Self {
        RiskError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for RiskError {
    fn from(err: bincode::Error) -> Self {
        RiskError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for RiskError {
    fn from(err: ndarray::ShapeError) -> Self {
        RiskError::SchemaMismatch {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RiskError::InsufficientData("only one class".to_string());
        assert_eq!(err.to_string(), "Insufficient data: only one class");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RiskError = io_err.into();
        assert!(matches!(err, RiskError::IoError(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_kinds_are_distinguishable() {
        let not_trained = RiskError::ModelNotTrained;
        let mismatch = RiskError::schema("14 features", "13 features");
        assert_ne!(not_trained.kind(), mismatch.kind());
        assert_eq!(
            serde_json::to_string(&mismatch.kind()).unwrap(),
            "\"schema_mismatch\""
        );
    }
}
