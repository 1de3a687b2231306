//! Error types

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The persistence layer rejected a write (disk full, permission revoked)
    #[error("Storage write error: {0}")]
    StorageWrite(String),

    /// The persistence layer failed to read
    #[error("Storage read error: {0}")]
    StorageRead(String),

    /// Encryption or decryption error
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Secure credential holder error (key missing, holder rejected a write)
    #[error("Keystore error: {0}")]
    Keystore(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database error while opening or preparing the SQLite backend
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
