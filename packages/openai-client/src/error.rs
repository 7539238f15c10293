//! Error types for the OpenAI client.

use thiserror::Error;

/// Result type for OpenAI client operations.
pub type Result<T> = std::result::Result<T, OpenAIError>;

/// OpenAI client errors.
#[derive(Debug, Error)]
pub enum OpenAIError {
    /// Connection failed, timed out, or the byte stream broke
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response (rate limit, invalid request, server error)
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body was not the JSON we expected
    #[error("Parse error: {0}")]
    Parse(String),

    /// The model output did not match the requested schema
    #[error("Schema violation: {0}")]
    Schema(String),

    /// The model refused or stopped before the document was complete
    #[error("Incomplete output: {0}")]
    Incomplete(String),
}

impl OpenAIError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            OpenAIError::Network(_) => true,
            OpenAIError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
