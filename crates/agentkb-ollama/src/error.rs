//! Error types for Ollama operations.

use thiserror::Error;

/// Errors that can occur when interacting with Ollama.
#[derive(Error, Debug)]
pub enum OllamaError {
    /// Request timeout.
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The requested model is not available.
    #[error("Model not found: {model}. Run 'ollama pull {model}' to download it.")]
    ModelNotFound { model: String },

    /// Ollama server is not running.
    #[error("Ollama server is not running at {host}. Start it with 'ollama serve'.")]
    ServerNotRunning { host: String },

    /// API returned an error response.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response, or the response was unusable.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl OllamaError {
    /// Whether retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            OllamaError::Timeout { .. } | OllamaError::ServerNotRunning { .. } => true,
            OllamaError::ApiError { status, .. } => *status == 429 || *status >= 500,
            OllamaError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            OllamaError::ModelNotFound { .. }
            | OllamaError::ParseError(_)
            | OllamaError::InvalidConfig(_) => false,
        }
    }
}

/// Result type for Ollama operations.
pub type OllamaResult<T> = Result<T, OllamaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(OllamaError::Timeout { seconds: 5 }.is_transient());
        assert!(OllamaError::ServerNotRunning {
            host: "http://localhost:11434".to_string()
        }
        .is_transient());
        assert!(OllamaError::ApiError {
            status: 503,
            message: "overloaded".to_string()
        }
        .is_transient());
        assert!(OllamaError::ApiError {
            status: 429,
            message: "slow down".to_string()
        }
        .is_transient());

        assert!(!OllamaError::ApiError {
            status: 400,
            message: "bad input".to_string()
        }
        .is_transient());
        assert!(!OllamaError::ModelNotFound {
            model: "nomic-embed-text".to_string()
        }
        .is_transient());
        assert!(!OllamaError::ParseError("empty embedding".to_string()).is_transient());
    }
}
