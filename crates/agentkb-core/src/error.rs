//! Error types for agentkb domain values.

use thiserror::Error;

/// Errors raised while constructing or validating domain values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

/// Result type alias using agentkb's core Error.
pub type Result<T> = std::result::Result<T, Error>;
