//! Error types for the device security controller

use thiserror::Error;

/// Security controller error
#[derive(Error, Debug)]
pub enum Error {
    /// Preference could not be persisted or read
    #[error("Storage error: {0}")]
    Storage(#[from] newsbite_storage::Error),

    /// Platform call failed
    #[error("Platform error: {0}")]
    Platform(String),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// JSON error while loading configuration
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
