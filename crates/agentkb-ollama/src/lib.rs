//! agentkb Ollama - embedding and generation capabilities.
//!
//! The pipeline only sees the [`Embedder`] and [`Generator`] traits; the
//! Ollama HTTP client is one implementation of each. [`rag`] holds the
//! grounded prompt construction used when answering questions.

mod client;
mod error;
mod provider;
pub mod rag;
mod types;

pub use client::OllamaClient;
pub use error::{OllamaError, OllamaResult};
pub use provider::{Embedder, Generator, OllamaEmbedder, OllamaGenerator};
pub use rag::{build_grounded_prompt, collect_sources, ContextItem};
pub use types::*;
