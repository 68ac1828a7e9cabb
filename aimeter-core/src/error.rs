//! Error types for aimeter-core

use thiserror::Error;

/// Main error type for the aimeter-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Logging setup error
    #[error("logging error: {0}")]
    Logging(String),

    /// Key-value storage failure that is not a database error
    #[error("storage error: {0}")]
    Storage(String),

    /// Tab/window metadata could not be read
    #[error("browser query failed: {0}")]
    Browser(String),

    /// The messaging channel to the background context is gone
    #[error("messaging channel closed: {0}")]
    ChannelClosed(String),

    /// A day key that is not `YYYY-MM-DD`
    #[error("invalid day key: {0}")]
    InvalidDayKey(String),
}

/// Result type alias for aimeter-core
pub type Result<T> = std::result::Result<T, Error>;
