//! Common error types for QNTX analysis helpers.

use thiserror::Error;

/// Error type for analysis operations.
///
/// Nothing in this crate catches or retries; every variant surfaces to the
/// caller as soon as it happens.
#[derive(Error, Debug)]
pub enum Error {
    /// Shape or length mismatch, empty batch, or an out-of-range option
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Index missing from a label mapping
    #[error("label index {0} not found in mapping")]
    LookupNotFound(usize),

    /// IO error (cache artifacts)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (cache artifacts, configuration)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Numeric routine failure inside a reducer
    #[error("reduction failed: {0}")]
    Reduce(String),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Result type alias using the analysis Error.
pub type Result<T> = std::result::Result<T, Error>;
