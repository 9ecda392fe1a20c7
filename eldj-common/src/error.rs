//! Common error types for Elena DJ

use thiserror::Error;

/// Common result type for Elena DJ operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading configuration and credentials
#[derive(Error, Debug)]
pub enum Error {
    /// Config file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML document could not be parsed
    #[error("Configuration parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
