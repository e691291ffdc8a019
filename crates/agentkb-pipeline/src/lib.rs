//! agentkb pipeline - document ingestion and grounded answering.
//!
//! This crate provides:
//! - Document parsing (PDF, Word, Excel, PowerPoint)
//! - Content chunking for retrieval
//! - The ingestion pipeline and its background queue
//! - Tenant-scoped retrieval-augmented answers
//! - The [`KnowledgeBase`] service tying them together

mod answerer;
pub mod blob;
mod chunker;
mod error;
mod ingestor;
pub mod parsers;
mod queue;
mod retry;
mod service;

#[cfg(test)]
mod testing;

pub use answerer::Answerer;
pub use blob::{BlobError, BlobStore, LocalBlobStore};
pub use chunker::{Chunker, Segment};
pub use error::{PipelineError, PipelineResult};
pub use ingestor::{IngestJob, IngestReport, Ingestor};
pub use parsers::{parse_document, ParsedDocument};
pub use queue::IngestQueue;
pub use retry::RetryPolicy;
pub use service::KnowledgeBase;
