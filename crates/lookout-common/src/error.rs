//! Error types for Lookout

use thiserror::Error;

/// Result type alias using Lookout Error
pub type Result<T> = std::result::Result<T, Error>;

/// Lookout error types
///
/// Validation and parameter errors are meant to be read by the calling agent,
/// so their messages are returned verbatim and must say how to fix the input.
#[derive(Error, Debug)]
pub enum Error {
    /// Structural problem in a query for its signal/request type combination
    #[error("{0}")]
    Validation(String),

    #[error("Invalid query parameter: {0}")]
    InvalidParameter(String),

    /// Non-2xx response from the telemetry backend, body kept as received
    #[error("Backend returned status {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("Backend request failed: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::InvalidParameter(_))
    }

    pub fn is_backend_error(&self) -> bool {
        matches!(self, Error::Backend { .. } | Error::Http(_))
    }

    /// Status code of a backend error, if this is one
    pub fn backend_status(&self) -> Option<u16> {
        match self {
            Error::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }
}
