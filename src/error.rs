//! # Error Types
//!
//! Custom error types for the Smart Room link using `thiserror`.

use thiserror::Error;

/// Main error type for the Smart Room link
#[derive(Debug, Error)]
pub enum SmartRoomError {
    /// Serial transport errors (open, read, write)
    #[error("Serial error: {0}")]
    Serial(String),

    /// CSV recording session errors
    #[error("Recording error: {0}")]
    Recording(String),

    /// CSV encoding errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation requires an open connection
    #[error("Not connected")]
    NotConnected,
}

/// Result type alias for the Smart Room link
pub type Result<T> = std::result::Result<T, SmartRoomError>;
