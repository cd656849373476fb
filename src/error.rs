use crate::sync::DecodeError;
use thiserror::Error;

/// Main error type for the library core.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found error.
    #[error("Book not found: {0}")]
    NotFound(String),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Malformed sync code.
    #[error("Invalid sync code: {0}")]
    Decode(#[from] DecodeError),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Key-value store error.
    #[error("Storage error: {0}")]
    Store(String),

    /// PDF or EPUB engine error.
    #[error("Reader error: {0}")]
    Reader(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Short text suitable for a user-facing notification.
    pub fn notice(&self) -> String {
        match self {
            AppError::Decode(_) => "Invalid sync code".to_string(),
            AppError::NotFound(_) => "Book not found".to_string(),
            AppError::Reader(_) => "Could not open this book".to_string(),
            AppError::Store(_) | AppError::Io(_) => "Could not save your library".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, AppError>;
