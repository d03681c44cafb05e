//! kdpack error types

use thiserror::Error;

/// kdpack error type
///
/// Every variant describes malformed or unsupported *data*. Misuse of the
/// encoders (bit counts outside `1..=32`, byte writes while bit mode is
/// active, ANS state overflow) is a programming error and panics instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Buffer underflow: needed {needed} bytes, {remaining} remaining")]
    BufferUnderflow { needed: usize, remaining: usize },

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid probability table: {0}")]
    InvalidProbabilityTable(String),

    #[error("Unsupported symbol coding scheme: {0}")]
    UnsupportedScheme(u8),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Encode error: {0}")]
    EncodeError(String),

    #[error("Decode error: {0}")]
    DecodeError(String),
}

/// kdpack result type
pub type Result<T> = std::result::Result<T, Error>;
