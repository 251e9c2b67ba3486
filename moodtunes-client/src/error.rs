//! Error types for moodtunes-client

use thiserror::Error;

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Server could not be reached
    #[error("Network error: {0}")]
    Network(String),

    /// Server did not answer within the request timeout
    #[error("Request timed out")]
    Timeout,

    /// Server answered with a non-success status
    #[error("Server returned {0}: {1}")]
    Status(u16, String),

    /// Response body was not the expected JSON
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Expression model failed to load or run
    #[error("Expression detection failed: {0}")]
    Detection(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_decode() {
            ClientError::Parse(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
