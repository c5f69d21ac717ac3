//! LLM error types.

use thiserror::Error;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("LLM request failed: {0}")]
    RequestFailed(String),

    /// The reply contained no balanced `{...}` object.
    #[error("No JSON object found in LLM response")]
    NoJsonObject,

    /// A `{...}` object was found but is not valid JSON.
    #[error("Failed to parse LLM response as JSON: {0}")]
    InvalidJson(String),

    /// Request timed out.
    #[error("LLM request timed out after {0}ms")]
    Timeout(u64),

    /// LLM provider is unavailable.
    #[error("LLM provider unavailable: {0}")]
    Unavailable(String),

    /// Configuration error.
    #[error("LLM configuration error: {0}")]
    ConfigError(String),
}

impl LlmError {
    /// Whether the reply arrived but could not be understood.
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::NoJsonObject | Self::InvalidJson(_))
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(0)
        } else if err.is_connect() {
            LlmError::Unavailable(err.to_string())
        } else {
            LlmError::RequestFailed(err.to_string())
        }
    }
}
