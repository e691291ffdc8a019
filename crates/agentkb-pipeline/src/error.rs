//! Error types for ingestion and answering.

use crate::blob::BlobError;
use agentkb_core::FileFormat;
use agentkb_db::DbError;
use agentkb_ollama::OllamaError;
use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can occur while ingesting documents or answering questions.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unsupported file type: {0} (supported: {supported})", supported = FileFormat::supported_extensions())]
    UnsupportedFormat(String),

    #[error("Failed to extract text: {0}")]
    ParseFailure(String),

    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(#[source] OllamaError),

    #[error("Failed to write to the index: {0}")]
    IndexWriteFailure(#[source] DbError),

    #[error("Generation service unavailable: {0}")]
    GenerationUnavailable(#[source] OllamaError),

    #[error("Agent not found: {0}")]
    TenantNotFound(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Document '{file_name}' already exists for this agent")]
    DuplicateDocument { file_name: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Blob store error: {0}")]
    Blob(#[from] BlobError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Ingestion queue is closed")]
    QueueClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<agentkb_core::Error> for PipelineError {
    fn from(err: agentkb_core::Error) -> Self {
        match err {
            agentkb_core::Error::UnsupportedFormat(name) => PipelineError::UnsupportedFormat(name),
            other => PipelineError::InvalidInput(other.to_string()),
        }
    }
}

impl From<agentkb_config::ConfigError> for PipelineError {
    fn from(err: agentkb_config::ConfigError) -> Self {
        PipelineError::InvalidConfig(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format_lists_accepted_types() {
        let err = PipelineError::from(agentkb_core::Error::UnsupportedFormat("notes.txt".into()));
        let message = err.to_string();
        assert!(message.contains("notes.txt"));
        assert!(message.contains(".pdf, .docx, .xlsx, .pptx"));
    }
}
