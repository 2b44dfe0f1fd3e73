// Типы ошибок

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NegotiationError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Сервер вернул конверт с ненулевым `code`
    #[error("API error {code}: {message}")]
    ApiError { code: i32, message: String },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<serde_json::Error> for NegotiationError {
    fn from(error: serde_json::Error) -> Self {
        NegotiationError::SerializationError(error.to_string())
    }
}

impl From<std::io::Error> for NegotiationError {
    fn from(error: std::io::Error) -> Self {
        NegotiationError::StorageError(error.to_string())
    }
}

#[cfg(feature = "native")]
impl From<reqwest::Error> for NegotiationError {
    fn from(error: reqwest::Error) -> Self {
        NegotiationError::NetworkError(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NegotiationError>;
