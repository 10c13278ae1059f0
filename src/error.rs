//! Error types for the Ratewarden service.

use thiserror::Error;

use crate::ratelimit::Algorithm;

/// Main error type for Ratewarden operations.
#[derive(Error, Debug)]
pub enum WardenError {
    /// A request arrived before any policy was installed
    #[error("Rate limiter not configured")]
    NotConfigured,

    /// The policy names an algorithm outside the recognized set
    #[error("Invalid algorithm: {0}")]
    InvalidAlgorithm(String),

    /// No limiter was registered for a recognized algorithm
    #[error("No limiter found for algorithm: {0}")]
    NoImplementation(Algorithm),

    /// The policy carries values no limiter can work with
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Layered configuration loading errors
    #[error("Configuration error: {0}")]
    Settings(#[from] ::config::ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Ratewarden operations.
pub type Result<T> = std::result::Result<T, WardenError>;
