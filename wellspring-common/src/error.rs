//! Common error types for Wellspring

use thiserror::Error;

/// Common result type for Wellspring operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Wellspring crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend reported an application-level error (`code != 0`)
    #[error("Backend error (code {code}): {message}")]
    Backend { code: i64, message: String },

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
