//! Common error types for sirenscan

use thiserror::Error;

/// Common result type for sirenscan operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the server and the command-line scanner
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
