//! Error types for reqshield.

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for reqshield operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The schema catalog collaborator could not supply its data.
    #[error("schema catalog unavailable: {message}")]
    Catalog {
        /// Human-readable error message.
        message: String,
    },

    /// A request document could not be parsed into the nested request model.
    #[error("invalid request document: {message}")]
    InvalidRequest {
        /// Human-readable error message.
        message: String,
    },

    /// I/O error while reading external input (CLI only).
    #[error("i/o error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a catalog error.
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog { message: message.into() }
    }

    /// Create an invalid-request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest { message: message.into() }
    }
}
