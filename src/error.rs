//! Error types for the relation engine
//!
//! Storage failures pass through unmodified; this layer performs no retries
//! and no local recovery.

use std::fmt;

/// Result type alias for model and relation operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Error types for model and relation operations
#[derive(Debug, Clone)]
pub enum ModelError {
    /// Database connection or query error, passed through from the driver
    Database(String),
    /// Record not found in the given table
    NotFound(String),
    /// Primary key is missing or invalid
    MissingPrimaryKey,
    /// Builder is not bound to a table or related model type
    UnboundRelated(String),
    /// associate() was given an owner model without a usable owner key
    IncompatibleAssociation { expected: String, model: String },
    /// Attribute write to a column the model does not declare
    UnknownAttribute { model: String, column: String },
    /// Serialization/deserialization error
    Serialization(String),
    /// Query building error
    Query(String),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Database(msg) => write!(f, "Database error: {}", msg),
            ModelError::NotFound(table) => write!(f, "Record not found in table '{}'", table),
            ModelError::MissingPrimaryKey => write!(f, "Primary key is missing or invalid"),
            ModelError::UnboundRelated(model) => {
                write!(f, "Query builder is not bound to a related model: {}", model)
            }
            ModelError::IncompatibleAssociation { expected, model } => write!(
                f,
                "Cannot associate '{}': no usable '{}' key on the given model",
                model, expected
            ),
            ModelError::UnknownAttribute { model, column } => {
                write!(f, "Model '{}' has no attribute '{}'", model, column)
            }
            ModelError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            ModelError::Query(msg) => write!(f, "Query error: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

// Convert from sqlx errors
impl From<sqlx::Error> for ModelError {
    fn from(err: sqlx::Error) -> Self {
        ModelError::Database(err.to_string())
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

// Convert from anyhow errors
impl From<anyhow::Error> for ModelError {
    fn from(err: anyhow::Error) -> Self {
        ModelError::Database(err.to_string())
    }
}
