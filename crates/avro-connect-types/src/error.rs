//! Error types for avro-connect-types crate.

use avro_schema::AvroSchemaError;
use connect_core::ConnectError;
use thiserror::Error;

/// Errors raised by schema and data translation.
///
/// Every error is local to one translation call; nothing here is retried.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Unsupported schema kind: {0}")]
    UnsupportedSchemaKind(String),

    #[error("Value does not match schema at '{path}': {message}")]
    SchemaValueMismatch { path: String, message: String },

    #[error("No union branch matches the value at '{path}'")]
    UnresolvedUnionBranch { path: String },

    #[error("Missing required name: {0}")]
    MissingRequiredName(String),

    #[error("Conflicting definitions of named type '{0}'")]
    NameConflict(String),

    #[error("Schema cache corrupted: {0}")]
    CacheCorruption(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Avro(#[from] AvroSchemaError),

    #[error(transparent)]
    Connect(#[from] ConnectError),
}

impl ConversionError {
    pub fn mismatch(path: &str, message: impl Into<String>) -> Self {
        Self::SchemaValueMismatch {
            path: display_path(path),
            message: message.into(),
        }
    }

    pub fn unresolved_union(path: &str) -> Self {
        Self::UnresolvedUnionBranch {
            path: display_path(path),
        }
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}

/// Result type alias for avro-connect-types operations.
pub type Result<T> = std::result::Result<T, ConversionError>;
