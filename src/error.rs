//! Error types for playlog
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Convenience Result type using the playlog Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for playlog
#[derive(Error, Debug)]
pub enum Error {
    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// History table bootstrap errors
    #[error("Schema error: {0}")]
    Schema(String),
}
