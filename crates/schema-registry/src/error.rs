//! Error types for schema-registry crate.

use avro_connect_types::ConversionError;
use avro_schema::AvroSchemaError;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the registry, the wire framing and the adapters.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Schema {0} is not registered")]
    SchemaNotFound(Uuid),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Unsupported header version byte: {0}")]
    UnsupportedHeaderVersion(u8),

    #[error("Unsupported compression: {0}")]
    UnsupportedCompression(String),

    #[error("Cannot derive subject: {0}")]
    Subject(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Avro(#[from] AvroSchemaError),
}

/// Result type alias for schema-registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
