#![forbid(unsafe_code)]

//! Common error type for resq crates.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResqError {
    /// I/O related failures.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parsing failures.
    #[error("Config parse error: {0}")]
    ConfigParse(toml::de::Error),

    /// Filesystem watch errors.
    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),
}

/// Convenient alias for results throughout resq crates.
pub type ResqResult<T> = Result<T, ResqError>;
