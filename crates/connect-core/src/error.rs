//! Error types for connect-core crate.

use thiserror::Error;

/// Errors raised while building or validating Connect schemas and values.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Invalid value at '{path}': {message}")]
    InvalidValue { path: String, message: String },

    #[error("Unknown struct reference: {0}")]
    UnknownReference(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid base64 bytes: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl ConnectError {
    pub fn invalid_value(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for connect-core operations.
pub type Result<T> = std::result::Result<T, ConnectError>;
