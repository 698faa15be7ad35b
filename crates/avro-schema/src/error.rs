//! Error types for avro-schema crate.

use thiserror::Error;

/// Errors raised while parsing, writing, or encoding Avro schemas and values.
#[derive(Error, Debug)]
pub enum AvroSchemaError {
    #[error("Invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema parse error: {0}")]
    Parse(String),

    #[error("Invalid name '{0}'")]
    InvalidName(String),

    #[error("Unknown type reference: {0}")]
    UnknownType(String),

    #[error("Duplicate definition of named type: {0}")]
    DuplicateName(String),

    #[error("Invalid union: {0}")]
    InvalidUnion(String),

    #[error("Invalid default for '{field}': {message}")]
    InvalidDefault { field: String, message: String },

    #[error("Value does not match schema: {0}")]
    ValueMismatch(String),

    #[error("Datum codec error: {0}")]
    Codec(String),
}

/// Result type alias for avro-schema operations.
pub type Result<T> = std::result::Result<T, AvroSchemaError>;
