//! Common error types for the Tide services

use thiserror::Error;

/// Common result type for Tide operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Tide microservices
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure modes of an alternate-id audit lookup.
///
/// Kept separate from [`Error`] because the WPOrg interception path needs to
/// pattern-match the invalid-altid kind: only that failure may be converted
/// into a stub audit, every other kind passes through untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// No audit matches the requested project type / slug / version
    #[error("no audit found for the requested project identity")]
    InvalidAltidLookup,

    /// Database failure during lookup
    #[error("lookup failed: {0}")]
    Db(String),
}
