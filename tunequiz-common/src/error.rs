//! Common error types for tunequiz

use thiserror::Error;

/// Common result type for tunequiz operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the tunequiz service
///
/// The first six variants form the request-level taxonomy; the HTTP layer
/// maps each of them to one transport status. The remaining variants wrap
/// infrastructure faults and surface as generic internal failures.
#[derive(Error, Debug)]
pub enum Error {
    /// Credential required but absent
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Credential present but failed verification (expired or malformed)
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// Requested level, song, or player absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authenticated but missing a required external linkage
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Operation already performed (e.g. level already played)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    BadRequest(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Music-provider request failure
    #[error("Provider error: {0}")]
    Provider(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
