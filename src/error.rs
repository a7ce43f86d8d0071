//! Error types for the agro-recommend services

use thiserror::Error;

/// Result type alias for agro-recommend operations
pub type Result<T> = std::result::Result<T, AgroError>;

/// Main error type for the recommendation services
#[derive(Error, Debug)]
pub enum AgroError {
    #[error("Data error: {0}")]
    Data(String),

    #[error("Required column not found in dataset: {0}")]
    MissingColumn(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Field {field} has the wrong type, expected {expected}")]
    FieldType { field: String, expected: &'static str },

    #[error("Unknown {column} category: {value}")]
    UnknownCategory { column: String, value: String },

    #[error("Training error: {0}")]
    Training(String),

    #[error("Transform or model is not fitted")]
    NotFitted,

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AgroError {
    /// True when the error was caused by the caller's input and should be
    /// reported back rather than treated as a service fault.
    pub fn is_client_input(&self) -> bool {
        matches!(
            self,
            AgroError::MissingField(_)
                | AgroError::FieldType { .. }
                | AgroError::UnknownCategory { .. }
        )
    }
}

impl From<polars::error::PolarsError> for AgroError {
    fn from(err: polars::error::PolarsError) -> Self {
        AgroError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for AgroError {
    fn from(err: serde_json::Error) -> Self {
        AgroError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for AgroError {
    fn from(err: ndarray::ShapeError) -> Self {
        AgroError::Shape {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
