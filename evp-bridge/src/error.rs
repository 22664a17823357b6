//! Error types for evp-bridge
//!
//! Only argument validation is reported to command callers. Unknown handles
//! are never an error, engine failures travel as session events, and
//! teardown swallows release failures after logging them.

use thiserror::Error;

/// Main error type for evp-bridge
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected command argument (non-positive speed, bad source descriptor, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Media engine failure while opening or driving a pipeline
    #[error("Engine error: {0}")]
    Engine(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Configuration and I/O errors bubbled up from evp-common
    #[error(transparent)]
    Common(#[from] evp_common::Error),
}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

/// Convenience Result type using evp-bridge Error
pub type Result<T> = std::result::Result<T, Error>;
